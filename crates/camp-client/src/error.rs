//! Error types for the client flows.
//!
//! `Display` strings are the messages shown to the user, so they are kept
//! short and free of internal detail. The underlying cause stays reachable
//! through `source()` for logging.

use reqwest::StatusCode;
use thiserror::Error;

/// Local credential storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents are not a JSON object: {0}")]
    Format(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Session errors. All of them are terminal for the screen that hit them.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Token not found")]
    Missing,

    #[error("Failed to fetch token")]
    Storage(#[source] StoreError),

    #[error("Failed to decode token")]
    Decode(#[source] jsonwebtoken::errors::Error),

    #[error("Failed to decode token or token does not contain ID")]
    MissingId,
}

/// Remote profile lookup errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch user data")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to fetch user data")]
    NotFound,

    #[error("Failed to fetch user data")]
    Status(StatusCode),

    #[error("Failed to fetch user data")]
    InvalidUrl,
}

/// Client-side form validation failures. Recoverable: the user fixes the
/// input and resubmits.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingFields,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error(
        "Password must be at least 7 characters long, and include uppercase, lowercase, digit, and special character"
    )]
    WeakPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Why the email verification call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyErrorKind {
    /// The verification token was rejected. The user has to sign in again.
    InvalidOrExpiredToken,
    /// The server refused the request for some other reason.
    Rejected,
    /// The request never got a response.
    Transport,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct VerifyError {
    pub kind: VerifyErrorKind,
    pub message: String,
}

impl VerifyError {
    pub fn new(kind: VerifyErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Sign-up flow errors.
#[derive(Debug, Error)]
pub enum SignUpError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Rejected(String),

    #[error("Failed to get user ID from registration response")]
    MissingUserId,

    #[error("Failed to get verification token")]
    MissingVerificationToken,

    #[error(transparent)]
    Verification(#[from] VerifyError),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SignUpError {
    /// Validation failures leave the form in place for another attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn verify_kind(&self) -> Option<VerifyErrorKind> {
        match self {
            Self::Verification(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// Realtime channel errors. These are logged by the binder and never reach
/// the screen state.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("invalid channel url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported channel url scheme {0:?}")]
    Scheme(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connect timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("malformed frame: {0}")]
    Frame(String),

    #[error("server refused connection: {0}")]
    Refused(String),

    #[error("connection closed during handshake")]
    Closed,
}

/// Configuration errors, raised before anything connects.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}
