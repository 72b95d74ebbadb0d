//! User store contract used by the session manager.

use async_trait::async_trait;

use super::types::User;

/// Errors reported by a user store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Durable user records, including the single live refresh token per user.
///
/// `current_refresh_token` is the only server-side revocation state:
/// replacing or clearing it invalidates every refresh token issued before.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user with the given digest and no active session.
    async fn create(&self, username: &str, password_digest: &str) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Unconditionally replace the live refresh token.
    async fn set_refresh_token(&self, id: &str, token: &str) -> Result<(), StoreError>;

    /// Replace the live refresh token only if it still equals `expected`.
    /// Returns `true` if the swap happened.
    async fn compare_and_swap_refresh_token(
        &self,
        id: &str,
        expected: &str,
        new_token: &str,
    ) -> Result<bool, StoreError>;

    /// Clear the live refresh token. Returns `true` if one was present.
    async fn clear_refresh_token(&self, id: &str) -> Result<bool, StoreError>;
}
