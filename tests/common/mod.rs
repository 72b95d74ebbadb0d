#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    http::{Request, Response},
};
use turnstile::{
    ServerConfig, create_app, create_session_manager,
    db::Database,
    jwt::{Claims, TokenLifetimes, TokenPurpose},
    password::Argon2Hasher,
    session::SessionManager,
};

pub const TEST_SECRET: &[u8] = b"test-jwt-secret-for-testing-only!";

/// Build a server config over a fresh in-memory database.
pub async fn test_config() -> ServerConfig {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");

    ServerConfig {
        base: None,
        db,
        jwt_secret: TEST_SECRET.to_vec(),
        token_lifetimes: TokenLifetimes::default(),
        hasher: Argon2Hasher::insecure_fast(),
        secure_cookies: false,
    }
}

/// Session manager over a fresh in-memory database.
pub async fn create_test_manager() -> (SessionManager, Database) {
    let config = test_config().await;
    (create_session_manager(&config), config.db)
}

/// Router over a fresh in-memory database.
pub async fn create_test_app() -> (axum::Router, Database) {
    let config = test_config().await;
    (create_app(&config), config.db)
}

/// Sign arbitrary claims with the test secret.
pub fn sign_claims(claims: &Claims) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET),
    )
    .expect("Failed to sign claims")
}

/// A correctly signed token that expired a minute ago.
pub fn expired_token(user_id: &str, purpose: TokenPurpose) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    sign_claims(&Claims {
        sub: user_id.to_string(),
        purpose,
        jti: uuid::Uuid::new_v4().to_string(),
        iat: now - 120,
        exp: now - 60,
    })
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn cookie_request(method: &str, uri: &str, refresh_token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("cookie", format!("refreshToken={}", refresh_token))
        .body(Body::empty())
        .unwrap()
}

pub fn bearer_request(uri: &str, access_token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", access_token))
        .body(Body::empty())
        .unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Value of the refresh cookie being set, if any (ignores clearing cookies).
pub fn refresh_cookie_value(response: &Response<Body>) -> Option<String> {
    extract_set_cookies(response).into_iter().find_map(|c| {
        let value = c.strip_prefix("refreshToken=")?.split(';').next()?.to_string();
        (!value.is_empty()).then_some(value)
    })
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).expect("Body is not JSON")
}
