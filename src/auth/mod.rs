//! HTTP credential transport: the refresh token travels in an HTTP-only
//! cookie, the access token in an `Authorization: Bearer` header.

mod bearer;
mod cookie;
mod extractors;

pub use bearer::bearer_token;
pub use cookie::{REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie};
pub use extractors::{BearerToken, RefreshCookie};
