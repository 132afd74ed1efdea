use tracing::{info, warn};

use camp_types::models::{PushedMessage, User};

use crate::channel::{ChannelBinding, ChannelStatus};
use crate::context::{AppContext, NotificationFlag};
use crate::presenter::NotificationView;

/// Top-level state of the notifications screen.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenState {
    Loading,
    /// Terminal. The message is shown as-is.
    Error(String),
    Ready(ReadyState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadyState {
    pub user: User,
    /// Pushed messages received while mounted, oldest first.
    pub live: Vec<PushedMessage>,
}

impl ScreenState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading",
            Self::Error(_) => "Error",
            Self::Ready(_) => "Ready",
        }
    }
}

/// Notifications screen: session → profile → channel binding → view.
///
/// The screen owns its channel binding. Unmounting (or dropping) the screen
/// releases it, and a new identity releases the old binding before binding
/// the new one.
pub struct NotificationsScreen {
    state: ScreenState,
    binding: Option<ChannelBinding>,
    flag: NotificationFlag,
}

impl NotificationsScreen {
    pub fn new(flag: NotificationFlag) -> Self {
        Self {
            state: ScreenState::Loading,
            binding: None,
            flag,
        }
    }

    /// Load the session user and bind the realtime channel to them.
    pub async fn mount(ctx: &AppContext) -> Self {
        let mut screen = Self::new(ctx.notifications.clone());
        match load_user(ctx).await {
            Ok(user) => screen.show_user(ctx, user).await,
            Err(message) => screen.state = ScreenState::Error(message),
        }
        screen
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            ScreenState::Ready(ready) => Some(&ready.user),
            _ => None,
        }
    }

    pub fn live(&self) -> &[PushedMessage] {
        match &self.state {
            ScreenState::Ready(ready) => &ready.live,
            _ => &[],
        }
    }

    pub fn view(&self) -> Option<NotificationView> {
        match &self.state {
            ScreenState::Ready(ready) => Some(NotificationView::build(&ready.user, &ready.live)),
            _ => None,
        }
    }

    pub fn channel_status(&self) -> Option<ChannelStatus> {
        self.binding.as_ref().map(ChannelBinding::status)
    }

    /// Wait until the channel has joined the user's room.
    pub async fn channel_joined(&mut self) -> bool {
        match self.binding.as_mut() {
            Some(binding) => binding.joined().await,
            None => false,
        }
    }

    /// Show a user snapshot. A different identity gets a fresh binding and an
    /// empty live list; the same identity only refreshes the snapshot. Ignored
    /// once the screen is in the error state.
    pub async fn show_user(&mut self, ctx: &AppContext, user: User) {
        if matches!(self.state, ScreenState::Error(_)) {
            return;
        }

        let same_identity = self
            .binding
            .as_ref()
            .is_some_and(|b| b.user_id() == user.id);

        if same_identity {
            if let ScreenState::Ready(ready) = &mut self.state {
                ready.user = user;
                return;
            }
        }

        if let Some(old) = self.binding.take() {
            info!("Identity changed from {} to {}, rebinding", old.user_id(), user.id);
            old.release().await;
        }
        self.binding = Some(ctx.channel.bind(&user.id));
        self.state = ScreenState::Ready(ReadyState {
            user,
            live: Vec::new(),
        });
    }

    /// Wait for the next pushed message and append it to the live list.
    ///
    /// Returns `None` when there is no binding or the channel has closed.
    pub async fn next_push(&mut self) -> Option<&PushedMessage> {
        let binding = self.binding.as_mut()?;
        let msg = binding.recv().await?;
        self.append(msg)
    }

    /// Append every message that has already arrived. Returns how many.
    pub fn drain_pushes(&mut self) -> usize {
        let mut count = 0;
        while let Some(msg) = self.binding.as_mut().and_then(ChannelBinding::try_recv) {
            if self.append(msg).is_some() {
                count += 1;
            }
        }
        count
    }

    fn append(&mut self, msg: PushedMessage) -> Option<&PushedMessage> {
        let ScreenState::Ready(ready) = &mut self.state else {
            return None;
        };
        self.flag.raise();
        ready.live.push(msg);
        ready.live.last()
    }

    /// Leave the screen. The channel binding is released before this returns.
    pub async fn unmount(mut self) {
        if let Some(binding) = self.binding.take() {
            binding.release().await;
        }
    }
}

async fn load_user(ctx: &AppContext) -> Result<User, String> {
    let user_id = ctx.sessions.load(ctx.store.as_ref()).map_err(|e| {
        warn!("Session unavailable: {:?}", e);
        e.to_string()
    })?;

    ctx.api.fetch_user(&user_id).await.map_err(|e| {
        warn!("Error fetching user data: {:?}", e);
        e.to_string()
    })
}
