//! JWT token minting and verification.
//!
//! Every token carries its purpose in the signed claims, so an access token
//! can never be accepted where a refresh token is expected (or vice versa).

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Short-lived bearer credential, never stored server side
    Access,
    /// Long-lived credential exchanged for a new pair, tracked per user
    Refresh,
}

/// JWT claims shared by both token purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Token purpose
    #[serde(rename = "typ")]
    pub purpose: TokenPurpose,
    /// JWT ID, unique per minted token
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Token lifetimes in seconds, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access_secs: u64,
    pub refresh_secs: u64,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access_secs: ACCESS_TOKEN_DURATION_SECS,
            refresh_secs: REFRESH_TOKEN_DURATION_SECS,
        }
    }
}

impl TokenLifetimes {
    pub fn for_purpose(&self, purpose: TokenPurpose) -> u64 {
        match purpose {
            TokenPurpose::Access => self.access_secs,
            TokenPurpose::Refresh => self.refresh_secs,
        }
    }
}

/// A freshly minted token.
#[derive(Debug, Clone)]
pub struct MintedToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetimes: TokenLifetimes,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and default lifetimes.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_lifetimes(secret, TokenLifetimes::default())
    }

    pub fn with_lifetimes(secret: &[u8], lifetimes: TokenLifetimes) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetimes,
        }
    }

    /// Mint a token for `subject` with the configured lifetime for `purpose`.
    pub fn mint(&self, subject: &str, purpose: TokenPurpose) -> Result<MintedToken, TokenError> {
        self.mint_for(subject, purpose, self.lifetimes.for_purpose(purpose))
    }

    /// Mint a token with an explicit lifetime.
    pub fn mint_for(
        &self,
        subject: &str,
        purpose: TokenPurpose,
        lifetime_secs: u64,
    ) -> Result<MintedToken, TokenError> {
        let now = unix_now()?;
        let exp = now + lifetime_secs;

        let claims = Claims {
            sub: subject.to_string(),
            purpose,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)?;

        Ok(MintedToken {
            token,
            expires_at: exp,
            duration: lifetime_secs,
        })
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// The purpose is NOT checked here; callers decide how a wrong purpose
    /// is reported.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}

fn unix_now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signature, structure or claims could not be verified
    #[error("malformed token")]
    Malformed,
    /// Signature is valid but the token is past its expiry
    #[error("token expired")]
    Expired,
    #[error("failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("system time error")]
    TimeError,
}
