//! Session operation error types.

use tracing::error;

/// Every way a session operation can fail, as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Username or password omitted; the store was not contacted
    #[error("Please include username and password")]
    MissingCredentials,
    /// Unknown username or wrong password, deliberately indistinct
    #[error("Invalid username or password")]
    InvalidCredentials,
    /// Presented token failed signature, expiry or purpose checks
    #[error("Invalid token")]
    InvalidToken,
    /// No session, wrong token purpose, or a superseded refresh token
    #[error("Session no longer valid")]
    InvalidSession,
    #[error("Username is already taken")]
    UsernameTaken,
    /// Cause is logged where it happens and never returned
    #[error("Internal error")]
    Internal,
}

impl SessionError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::MissingCredentials => "missing_credentials",
            SessionError::InvalidCredentials => "invalid_credentials",
            SessionError::InvalidToken => "invalid_token",
            SessionError::InvalidSession => "invalid_session",
            SessionError::UsernameTaken => "username_taken",
            SessionError::Internal => "internal",
        }
    }
}

/// Extension trait for logging a failure and collapsing it into `Internal`.
pub trait ResultExt<T> {
    fn internal(self, msg: &str) -> Result<T, SessionError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn internal(self, msg: &str) -> Result<T, SessionError> {
        self.map_err(|e| {
            error!(error = %e, "{}", msg);
            SessionError::Internal
        })
    }
}
