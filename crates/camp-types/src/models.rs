use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{opt_string_or_number, string_or_number};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images_profile: Vec<String>,
    /// Relationship records, in the order the backend returned them.
    #[serde(default)]
    pub join_camping_posts: Vec<JoinCampingPost>,
    #[serde(default)]
    pub posts: Vec<Post>,
}

impl User {
    pub fn primary_image(&self) -> Option<&str> {
        self.images_profile.first().map(String::as_str)
    }
}

/// Join record between a user and a camping post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCampingPost {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub post_id: Option<i64>,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub reviews: Option<String>,
    #[serde(default)]
    pub favorite: Favorite,
    #[serde(default)]
    pub notification: String,
    pub status: JoinStatus,
    #[serde(default)]
    pub user: Option<Box<User>>,
    #[serde(default)]
    pub post: Option<Box<Post>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinStatus {
    Accepted,
    Rejected,
    Pending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Favorite {
    Yes,
    #[default]
    No,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub places: u32,
    #[serde(default)]
    pub age_category: Option<AgeCategory>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub organizer_id: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub join_camping_posts: Vec<JoinCampingPost>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgeCategory {
    Adult,
    Child,
    Teen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostStatus {
    InProgress,
    Completed,
    Cancelled,
}

/// A server-originated realtime notification. Lives only in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushedMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    pub message: String,
}
