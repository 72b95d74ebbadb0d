//! Axum extractors for presented credentials.
//!
//! These never reject: a missing credential is passed on as `None` so the
//! session manager decides which error it maps to.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::bearer::bearer_token;
use super::cookie::{REFRESH_COOKIE_NAME, get_cookie};

/// The `refreshToken` cookie, if the client sent one.
pub struct RefreshCookie(pub Option<String>);

impl<S> FromRequestParts<S> for RefreshCookie
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RefreshCookie(
            get_cookie(&parts.headers, REFRESH_COOKIE_NAME).map(str::to_string),
        ))
    }
}

/// The bearer access token from the `Authorization` header, if present.
pub struct BearerToken(pub Option<String>);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(BearerToken(bearer_token(&parts.headers).map(str::to_string)))
    }
}
