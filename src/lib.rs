pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod session;

use api::create_api_router;
use axum::Router;
use db::Database;
use jwt::{JwtConfig, TokenLifetimes};
use password::Argon2Hasher;
use session::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Base path for the application (e.g., "/auth")
    pub base: Option<String>,
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Access and refresh token lifetimes
    pub token_lifetimes: TokenLifetimes,
    /// Password hasher (cost parameters are configurable)
    pub hasher: Argon2Hasher,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
}

/// Build the session manager wired to the SQLite store.
pub fn create_session_manager(config: &ServerConfig) -> SessionManager {
    let jwt = Arc::new(JwtConfig::with_lifetimes(
        &config.jwt_secret,
        config.token_lifetimes,
    ));
    SessionManager::new(
        Arc::new(config.db.users()),
        Arc::new(config.hasher.clone()),
        jwt,
    )
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let api_router = create_api_router(create_session_manager(config), config.secure_cookies);

    let base_path = config.base.as_deref().unwrap_or("");
    Router::new().nest(&format!("{}/api", base_path), api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
