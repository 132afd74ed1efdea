use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_SERVER_URL: &str = "http://192.168.10.20:5000";
pub const DEFAULT_JWT_SECRET: &str = "mySuperSecretPrivateKey";
pub const DEFAULT_STORE_PATH: &str = "camp-store.json";

/// Client configuration. Built once at the app root.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    pub channel: ChannelConfig,
    /// Shared symmetric key the session token is signed with.
    pub jwt_secret: String,
    pub store_path: PathBuf,
}

/// Realtime channel transport settings.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Base URL of the realtime server (`http`, `https`, `ws` or `wss`).
    pub url: String,
    /// Reconnection attempts after a failed or dropped connection.
    pub reconnection_attempts: u32,
    /// Fixed timeout for each connection attempt, handshake included.
    pub connect_timeout: Duration,
    /// Fixed delay between reconnection attempts.
    pub reconnection_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            reconnection_attempts: 5,
            connect_timeout: Duration::from_millis(5000),
            reconnection_delay: Duration::from_millis(1000),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_SERVER_URL.to_string(),
            channel: ChannelConfig::default(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl ClientConfig {
    /// Read configuration from `CAMP_*` environment variables, falling back
    /// to the defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let channel_defaults = ChannelConfig::default();

        let api_url = lookup("CAMP_API_URL").unwrap_or(defaults.api_url);
        let channel_url = lookup("CAMP_SOCKET_URL").unwrap_or(channel_defaults.url);

        let reconnection_attempts = match lookup("CAMP_RECONNECT_ATTEMPTS") {
            Some(v) => parse_number("CAMP_RECONNECT_ATTEMPTS", &v)?,
            None => channel_defaults.reconnection_attempts,
        };
        let connect_timeout = match lookup("CAMP_CONNECT_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(parse_number("CAMP_CONNECT_TIMEOUT_MS", &v)?),
            None => channel_defaults.connect_timeout,
        };
        let reconnection_delay = match lookup("CAMP_RECONNECT_DELAY_MS") {
            Some(v) => Duration::from_millis(parse_number("CAMP_RECONNECT_DELAY_MS", &v)?),
            None => channel_defaults.reconnection_delay,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            channel: ChannelConfig {
                url: channel_url.trim_end_matches('/').to_string(),
                reconnection_attempts,
                connect_timeout,
                reconnection_delay,
            },
            jwt_secret: lookup("CAMP_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            store_path: lookup("CAMP_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}
