pub mod api;
pub mod card;
pub mod channel;
pub mod config;
pub mod context;
pub mod error;
pub mod presenter;
pub mod screen;
pub mod session;
pub mod signup;
pub mod store;
pub mod validation;

pub use api::ApiClient;
pub use channel::{ChannelBinder, ChannelBinding, ChannelStatus};
pub use config::ClientConfig;
pub use context::{AppContext, NotificationFlag};
pub use screen::{NotificationsScreen, ScreenState};
