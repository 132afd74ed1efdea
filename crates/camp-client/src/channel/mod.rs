pub mod binder;
pub mod frame;

pub use binder::{ChannelBinder, ChannelBinding, ChannelStatus};
