//! Sign-up input validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

/// Symbols that satisfy the "special character" password rule.
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

pub const MIN_PASSWORD_LEN: usize = 7;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// `local@domain.tld`, no whitespace, exactly one `@`.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// At least seven characters on a single line, with an uppercase letter, a
/// lowercase letter, a digit, and one of [`PASSWORD_SYMBOLS`].
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let single_line = !password.contains(['\n', '\r', '\u{2028}', '\u{2029}']);
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if long_enough && single_line && has_upper && has_lower && has_digit && has_symbol {
        Ok(())
    } else {
        Err(ValidationError::WeakPassword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(validate_email("jo@camp.io").is_ok());
        assert!(validate_email("first.last+tag@sub.domain.org").is_ok());

        assert!(validate_email("jo@camp").is_err());
        assert!(validate_email("jo camp@site.io").is_err());
        assert!(validate_email("jo@@camp.io").is_err());
        assert!(validate_email("@camp.io").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("Abcdef1!").is_ok());
        assert!(validate_password("Zz9{xyz").is_ok());

        assert_eq!(validate_password("abcdefg"), Err(ValidationError::WeakPassword));
        assert!(validate_password("Abc1!").is_err()); // too short
        assert!(validate_password("ABCDEF1!").is_err()); // no lowercase
        assert!(validate_password("abcdef1!").is_err()); // no uppercase
        assert!(validate_password("Abcdefg!").is_err()); // no digit
        assert!(validate_password("Abcdefg1").is_err()); // no symbol
        assert!(validate_password("Abcdefg1-").is_err()); // '-' is not in the symbol set
        assert!(validate_password("Abc\ndef1!").is_err());
    }
}
