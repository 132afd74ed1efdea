use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::api::ApiClient;
use crate::channel::ChannelBinder;
use crate::config::ClientConfig;
use crate::session::SessionDecoder;
use crate::store::{CredentialStore, FileStore};

/// "Has new notifications" flag shared by every screen of the process.
///
/// Created once with the [`AppContext`] and cloned into whoever needs it.
/// Starts cleared and is never torn down.
#[derive(Debug, Clone, Default)]
pub struct NotificationFlag {
    inner: Arc<AtomicBool>,
}

impl NotificationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_new(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    pub fn set(&self, value: bool) {
        self.inner.store(value, Ordering::Release);
    }

    pub fn raise(&self) {
        self.set(true);
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.inner.swap(false, Ordering::AcqRel)
    }
}

/// Root object of the client. Everything a screen needs hangs off it.
#[derive(Clone)]
pub struct AppContext {
    pub api: ApiClient,
    pub store: Arc<dyn CredentialStore>,
    pub sessions: Arc<SessionDecoder>,
    pub channel: ChannelBinder,
    pub notifications: NotificationFlag,
}

impl AppContext {
    /// Context backed by the on-disk store named in `config`.
    pub fn new(config: &ClientConfig) -> Self {
        let store = Arc::new(FileStore::new(&config.store_path));
        Self::with_store(config, store)
    }

    pub fn with_store(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            api: ApiClient::new(&config.api_url),
            store,
            sessions: Arc::new(SessionDecoder::new(&config.jwt_secret)),
            channel: ChannelBinder::new(config.channel.clone()),
            notifications: NotificationFlag::new(),
        }
    }
}
