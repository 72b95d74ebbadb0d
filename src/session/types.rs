//! Session result and user view types.

use serde::Serialize;

/// Full user record as held by the store. Never serialized.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_digest: String,
    pub current_refresh_token: Option<String>,
    pub created_at: String,
}

/// User as shown to clients, without the digest or live refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// Result of signup or login.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub user: UserView,
    pub access_token: String,
    /// Goes into the cookie, never into a response body
    pub refresh_token: String,
    /// Refresh token lifetime in seconds (cookie Max-Age)
    pub refresh_max_age: u64,
}

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_max_age: u64,
}
