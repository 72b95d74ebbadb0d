mod error;
mod sessions;

use axum::Router;

use crate::session::SessionManager;

pub use sessions::SessionsState;

/// Create the API router.
pub fn create_api_router(sessions: SessionManager, secure_cookies: bool) -> Router {
    let sessions_state = sessions::SessionsState {
        sessions,
        secure_cookies,
    };

    Router::new().merge(sessions::router(sessions_state))
}
