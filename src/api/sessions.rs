//! Session API endpoints.
//!
//! - POST `/signup` - Create an account, returns user + access token, sets refresh cookie
//! - POST `/login` - Password login, same response as signup
//! - GET/POST `/refresh` - Rotate the refresh cookie and issue a new access token
//! - GET `/me` - Current user from the bearer access token
//! - POST `/logout` - End the session and clear the refresh cookie

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::auth::{BearerToken, RefreshCookie, clear_refresh_cookie, refresh_cookie};
use crate::session::{SessionError, SessionGrant, SessionManager, UserView};

#[derive(Clone)]
pub struct SessionsState {
    pub sessions: SessionManager,
    pub secure_cookies: bool,
}

pub fn router(state: SessionsState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/refresh", get(refresh).post(refresh))
        .route("/me", get(me))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CredentialsRequest {
    username: String,
    password: String,
}

impl CredentialsRequest {
    /// A missing or unreadable body counts as missing credentials.
    fn parse(body: &Bytes) -> Result<Self, SessionError> {
        serde_json::from_slice(body).map_err(|_| SessionError::MissingCredentials)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user: UserView,
    access_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

#[derive(Serialize)]
struct MeResponse {
    user: UserView,
}

fn session_response(grant: SessionGrant, secure: bool) -> impl IntoResponse {
    let cookie = refresh_cookie(&grant.refresh_token, grant.refresh_max_age, secure);
    (
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(SessionResponse {
            user: grant.user,
            access_token: grant.access_token,
        }),
    )
}

async fn signup(
    State(state): State<SessionsState>,
    body: Bytes,
) -> Result<impl IntoResponse, SessionError> {
    let request = CredentialsRequest::parse(&body)?;
    let grant = state
        .sessions
        .signup(&request.username, &request.password)
        .await?;
    Ok(session_response(grant, state.secure_cookies))
}

async fn login(
    State(state): State<SessionsState>,
    body: Bytes,
) -> Result<impl IntoResponse, SessionError> {
    let request = CredentialsRequest::parse(&body)?;
    let grant = state
        .sessions
        .login(&request.username, &request.password)
        .await?;
    Ok(session_response(grant, state.secure_cookies))
}

async fn refresh(
    State(state): State<SessionsState>,
    RefreshCookie(token): RefreshCookie,
) -> Result<impl IntoResponse, SessionError> {
    let grant = state.sessions.refresh(token.as_deref()).await?;
    let cookie = refresh_cookie(
        &grant.refresh_token,
        grant.refresh_max_age,
        state.secure_cookies,
    );
    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(RefreshResponse {
            access_token: grant.access_token,
        }),
    ))
}

async fn me(
    State(state): State<SessionsState>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse, SessionError> {
    let user = state.sessions.me(token.as_deref()).await?;
    Ok(Json(MeResponse { user }))
}

async fn logout(
    State(state): State<SessionsState>,
    RefreshCookie(token): RefreshCookie,
) -> Result<impl IntoResponse, SessionError> {
    state.sessions.logout(token.as_deref()).await?;
    Ok((
        StatusCode::OK,
        [(SET_COOKIE, clear_refresh_cookie(state.secure_cookies))],
        Json(serde_json::json!({ "success": true })),
    ))
}
