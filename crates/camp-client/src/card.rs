use std::fmt;

use camp_types::models::User;

use crate::presenter::DEFAULT_PROFILE_IMAGE;

/// Search result card: picture and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCard {
    pub user_id: String,
    pub name: String,
    pub image_url: String,
}

impl From<&User> for UserCard {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            image_url: user
                .primary_image()
                .unwrap_or(DEFAULT_PROFILE_IMAGE)
                .to_string(),
        }
    }
}

impl fmt::Display for UserCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.image_url)
    }
}
