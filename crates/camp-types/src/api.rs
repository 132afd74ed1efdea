use serde::{Deserialize, Serialize};

use crate::ids::opt_string_or_number;
use crate::models::User;

// -- Session token claims --

/// Claims carried by the persisted credential token. Only `id` is used by the
/// client; everything else the backend puts in the token is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

// -- Registration --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Registration response. Every level is optional because the client has to
/// tell "registered but no id" apart from a transport failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub user: Option<RegisteredUser>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisteredUser {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
}

impl RegisterResponse {
    pub fn user_id(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

// -- Email verification --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationResponse {
    #[serde(default)]
    pub token: Option<String>,
}

// -- Errors --

/// Error body returned by the backend on 4xx/5xx. Either field may be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}
