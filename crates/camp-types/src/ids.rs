//! Identifier normalization.
//!
//! The backend is not consistent about identifier encoding: user ids come back
//! as JSON strings in some payloads and as numbers in others. Everything on the
//! client side treats them as strings.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Uint(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Int(n) => n.to_string(),
            RawId::Uint(n) => n.to_string(),
        }
    }
}

/// Deserialize a string-or-number id into a `String`.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

/// Same as [`string_or_number`], for optional fields. `null` maps to `None`.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawId>::deserialize(deserializer).map(|v| v.map(String::from))
}
