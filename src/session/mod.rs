//! Session lifecycle: signup, login, refresh rotation, identity and logout.
//!
//! Access tokens are stateless and valid until they expire. Refresh tokens
//! are single-use: each user has at most one live refresh token, stored
//! verbatim, and every refresh swaps it for a new one with compare-and-swap
//! so two concurrent refreshes of the same token can never both succeed.

mod errors;
mod store;
mod types;

pub use errors::{ResultExt, SessionError};
pub use store::{StoreError, UserStore};
pub use types::{RefreshGrant, SessionGrant, User, UserView};

use std::sync::Arc;

use tracing::{info, warn};

use crate::jwt::{Claims, JwtConfig, TokenError, TokenPurpose};
use crate::password::CredentialHasher;

/// Orchestrates all session operations. Holds no per-user state itself.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    jwt: Arc<JwtConfig>,
}

/// An access + refresh pair minted together.
struct TokenPair {
    access: String,
    refresh: String,
    refresh_max_age: u64,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        jwt: Arc<JwtConfig>,
    ) -> Self {
        Self { store, hasher, jwt }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Create an account and start its first session.
    pub async fn signup(&self, username: &str, password: &str) -> Result<SessionGrant, SessionError> {
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }

        let digest = self.hash_password(password).await?;

        let user = match self.store.create(username, &digest).await {
            Ok(user) => user,
            Err(StoreError::UsernameTaken) => return Err(SessionError::UsernameTaken),
            Err(e) => return Err(e).internal("Failed to create user"),
        };

        let pair = self.mint_pair(&user.id)?;
        self.store
            .set_refresh_token(&user.id, &pair.refresh)
            .await
            .internal("Failed to store refresh token")?;

        info!(user_id = %user.id, "User signed up");

        Ok(grant(user, pair))
    }

    /// Authenticate with username and password and start a new session.
    ///
    /// A successful login replaces the stored refresh token, which ends any
    /// other session the user had.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionGrant, SessionError> {
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }

        let Some(user) = self
            .store
            .find_by_username(username)
            .await
            .internal("Failed to look up user")?
        else {
            info!("Login failed: unknown username");
            return Err(SessionError::InvalidCredentials);
        };

        // Nothing may be minted or stored before the password is checked
        if !self.verify_password(password, &user.password_digest).await? {
            info!(user_id = %user.id, "Login failed: wrong password");
            return Err(SessionError::InvalidCredentials);
        }

        let pair = self.mint_pair(&user.id)?;
        self.store
            .set_refresh_token(&user.id, &pair.refresh)
            .await
            .internal("Failed to store refresh token")?;

        info!(user_id = %user.id, "User logged in");

        Ok(grant(user, pair))
    }

    /// Exchange the live refresh token for a new access + refresh pair.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<RefreshGrant, SessionError> {
        let presented = non_empty(refresh_token).ok_or(SessionError::InvalidSession)?;
        let claims = self.verify_refresh(presented)?;

        let user = self
            .store
            .find_by_id(&claims.sub)
            .await
            .internal("Failed to look up user")?
            .ok_or(SessionError::InvalidSession)?;

        if user.current_refresh_token.as_deref() != Some(presented) {
            warn!(user_id = %user.id, "Rejected superseded refresh token");
            return Err(SessionError::InvalidSession);
        }

        let pair = self.mint_pair(&user.id)?;

        let swapped = self
            .store
            .compare_and_swap_refresh_token(&user.id, presented, &pair.refresh)
            .await
            .internal("Failed to rotate refresh token")?;

        if !swapped {
            warn!(user_id = %user.id, "Lost refresh rotation race");
            return Err(SessionError::InvalidSession);
        }

        info!(user_id = %user.id, "Rotated refresh token");

        Ok(RefreshGrant {
            access_token: pair.access,
            refresh_token: pair.refresh,
            refresh_max_age: pair.refresh_max_age,
        })
    }

    /// Resolve the user behind an access token.
    ///
    /// There is no server-side revocation check: an access token stays valid
    /// until it expires, even after logout.
    pub async fn me(&self, access_token: Option<&str>) -> Result<UserView, SessionError> {
        let token = non_empty(access_token).ok_or(SessionError::InvalidToken)?;

        let claims = self
            .jwt
            .verify(token)
            .map_err(|_| SessionError::InvalidToken)?;
        if claims.purpose != TokenPurpose::Access {
            return Err(SessionError::InvalidToken);
        }

        let user = self
            .store
            .find_by_id(&claims.sub)
            .await
            .internal("Failed to look up user")?
            .ok_or(SessionError::InvalidToken)?;

        Ok(user.into())
    }

    /// End the user's session.
    ///
    /// Any authentic refresh token for the user ends the live session, even
    /// one that has since been rotated away. Fails with `InvalidSession` when
    /// there is no live session left to end.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), SessionError> {
        let presented = non_empty(refresh_token).ok_or(SessionError::InvalidSession)?;
        let claims = self.verify_refresh(presented)?;

        let cleared = self
            .store
            .clear_refresh_token(&claims.sub)
            .await
            .internal("Failed to clear refresh token")?;

        if !cleared {
            return Err(SessionError::InvalidSession);
        }

        info!(user_id = %claims.sub, "User logged out");
        Ok(())
    }

    /// Verify a presented refresh token's signature, expiry and purpose.
    fn verify_refresh(&self, token: &str) -> Result<Claims, SessionError> {
        let claims = self.jwt.verify(token).map_err(|e| match e {
            TokenError::Expired | TokenError::Malformed => SessionError::InvalidToken,
            other => {
                tracing::error!(error = %other, "Failed to verify refresh token");
                SessionError::Internal
            }
        })?;

        if claims.purpose != TokenPurpose::Refresh || claims.sub.is_empty() {
            return Err(SessionError::InvalidSession);
        }

        Ok(claims)
    }

    fn mint_pair(&self, user_id: &str) -> Result<TokenPair, SessionError> {
        let access = self
            .jwt
            .mint(user_id, TokenPurpose::Access)
            .internal("Failed to mint access token")?;
        let refresh = self
            .jwt
            .mint(user_id, TokenPurpose::Refresh)
            .internal("Failed to mint refresh token")?;

        Ok(TokenPair {
            access: access.token,
            refresh: refresh.token,
            refresh_max_age: refresh.duration,
        })
    }

    async fn hash_password(&self, password: &str) -> Result<String, SessionError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .internal("Password hashing task failed")?
            .internal("Failed to hash password")
    }

    async fn verify_password(&self, password: &str, digest: &str) -> Result<bool, SessionError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let digest = digest.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .internal("Password verification task failed")
    }
}

fn grant(user: User, pair: TokenPair) -> SessionGrant {
    SessionGrant {
        user: user.into(),
        access_token: pair.access,
        refresh_token: pair.refresh,
        refresh_max_age: pair.refresh_max_age,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
