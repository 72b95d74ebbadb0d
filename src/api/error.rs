//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::session::SessionError;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

pub(crate) fn status_code(error: &SessionError) -> StatusCode {
    match error {
        SessionError::MissingCredentials
        | SessionError::InvalidCredentials
        | SessionError::InvalidToken
        | SessionError::InvalidSession => StatusCode::UNAUTHORIZED,
        SessionError::UsernameTaken => StatusCode::CONFLICT,
        SessionError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Error responses never set or clear the refresh cookie: a losing concurrent
// refresh must not wipe the cookie the winning request just set.
impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        (
            status_code(&self),
            Json(ErrorResponse {
                error: self.to_string(),
                code: self.code(),
            }),
        )
            .into_response()
    }
}
