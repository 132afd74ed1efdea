use std::collections::HashSet;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::debug;

use camp_types::api::Claims;

use crate::error::SessionError;
use crate::store::{CredentialStore, TOKEN_KEY};

/// Turns the persisted credential token into a user id.
pub struct SessionDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl SessionDecoder {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // Tokens issued by the backend carry no exp/aud; `exp` is still checked when present.
        validation.required_spec_claims = HashSet::new();
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Read the token from `store` and decode it.
    pub fn load(&self, store: &dyn CredentialStore) -> Result<String, SessionError> {
        let raw = store
            .get(TOKEN_KEY)
            .map_err(SessionError::Storage)?
            .ok_or(SessionError::Missing)?;
        self.decode(&raw)
    }

    /// Decode a raw token, with or without its `Bearer ` prefix.
    pub fn decode(&self, raw: &str) -> Result<String, SessionError> {
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();

        let token_data =
            decode::<Claims>(token, &self.key, &self.validation).map_err(SessionError::Decode)?;

        let user_id = token_data
            .claims
            .id
            .filter(|id| !id.is_empty())
            .ok_or(SessionError::MissingId)?;

        debug!("Session decoded for user {}", user_id);
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn sign(claims: serde_json::Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn decodes_id_with_and_without_bearer_prefix() {
        let decoder = SessionDecoder::new(SECRET);
        let token = sign(json!({ "id": "42" }));

        assert_eq!(decoder.decode(&token).unwrap(), "42");
        assert_eq!(decoder.decode(&format!("Bearer {token}")).unwrap(), "42");
    }

    #[test]
    fn numeric_id_is_accepted() {
        let decoder = SessionDecoder::new(SECRET);
        assert_eq!(decoder.decode(&sign(json!({ "id": 7 }))).unwrap(), "7");
    }

    #[test]
    fn missing_or_empty_id_is_invalid_session() {
        let decoder = SessionDecoder::new(SECRET);
        for claims in [json!({ "name": "jo" }), json!({ "id": "" }), json!({ "id": null })] {
            let err = decoder.decode(&sign(claims)).unwrap_err();
            assert!(matches!(err, SessionError::MissingId), "got {err:?}");
            assert_eq!(
                err.to_string(),
                "Failed to decode token or token does not contain ID"
            );
        }
    }

    #[test]
    fn malformed_or_foreign_tokens_fail_to_decode() {
        let decoder = SessionDecoder::new(SECRET);
        let foreign = encode(
            &Header::default(),
            &json!({ "id": "42" }),
            &EncodingKey::from_secret(b"someone-else"),
        )
        .unwrap();

        for token in ["", "abc.def.ghi", "Bearer not-a-jwt", foreign.as_str()] {
            let err = decoder.decode(token).unwrap_err();
            assert!(matches!(err, SessionError::Decode(_)), "{token:?} gave {err:?}");
            assert_eq!(err.to_string(), "Failed to decode token");
        }
    }

    #[test]
    fn expired_token_is_rejected() {
        let decoder = SessionDecoder::new(SECRET);
        let token = sign(json!({ "id": "42", "exp": 1 }));
        assert!(matches!(decoder.decode(&token), Err(SessionError::Decode(_))));
    }

    #[test]
    fn load_reports_missing_token() {
        let decoder = SessionDecoder::new(SECRET);
        let store = MemoryStore::new();
        let err = decoder.load(&store).unwrap_err();
        assert!(matches!(err, SessionError::Missing));
        assert_eq!(err.to_string(), "Token not found");

        let store = MemoryStore::with_token(&format!("Bearer {}", sign(json!({ "id": "42" }))));
        assert_eq!(decoder.load(&store).unwrap(), "42");
    }
}
