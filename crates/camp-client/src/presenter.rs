//! Notification list view model.
//!
//! Two groups, shown one after the other and never merged: live pushed
//! messages in arrival order, then one line per relationship record of the
//! user snapshot.

use std::fmt;

use camp_types::models::{JoinStatus, PushedMessage, User};

/// Shown when the user has no profile image.
pub const DEFAULT_PROFILE_IMAGE: &str = "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcSRuRip5LBOHjlx6SIMhLsGHLxpw_wUUXG8Z0sz9YUBaP9PstT_BmRY1CGaFBqqDeFAX9w&usqp=CAU";

pub const UNKNOWN_SENDER: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveLine {
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLine {
    pub name: String,
    pub image_url: String,
    pub message: String,
    pub status: JoinStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub live: Vec<LiveLine>,
    pub records: Vec<RecordLine>,
}

impl NotificationView {
    pub const TITLE: &'static str = "Notifications";

    pub fn build(user: &User, live: &[PushedMessage]) -> Self {
        let sender = if user.name.is_empty() {
            UNKNOWN_SENDER.to_string()
        } else {
            user.name.clone()
        };
        let image_url = user.primary_image().unwrap_or(DEFAULT_PROFILE_IMAGE);

        let live = live
            .iter()
            .map(|m| LiveLine {
                sender: sender.clone(),
                text: m.message.clone(),
            })
            .collect();

        let records = user
            .join_camping_posts
            .iter()
            .map(|record| RecordLine {
                name: user.name.clone(),
                image_url: image_url.to_string(),
                message: record.notification.clone(),
                status: record.status,
            })
            .collect();

        Self { live, records }
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty() && self.records.is_empty()
    }
}

impl fmt::Display for LiveLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.text)
    }
}

impl fmt::Display for RecordLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} - {}", status_label(self.status), self.name, self.message)
    }
}

impl fmt::Display for NotificationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", Self::TITLE)?;
        for line in &self.live {
            writeln!(f, "  {line}")?;
        }
        for line in &self.records {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

fn status_label(status: JoinStatus) -> &'static str {
    match status {
        JoinStatus::Accepted => "accepted",
        JoinStatus::Rejected => "rejected",
        JoinStatus::Pending => "pending",
    }
}
