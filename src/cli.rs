//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::{ACCESS_TOKEN_DURATION_SECS, REFRESH_TOKEN_DURATION_SECS, TokenLifetimes};
use crate::password::Argon2Hasher;
use clap::Parser;
use tracing::{error, info, warn};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "turnstile",
    about = "Password login with rotating refresh-token sessions"
)]
pub struct Args {
    /// Base path prefix. API is served at {base}/api
    #[arg(short, long, value_parser = validate_base_path)]
    pub base: Option<String>,

    /// Port to listen on
    #[arg(short, long, default_value = "7292")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "turnstile.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Set the Secure flag on the refresh cookie (enable behind HTTPS)
    #[arg(long, env = "SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = ACCESS_TOKEN_DURATION_SECS)]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds (also the refresh cookie Max-Age)
    #[arg(long, default_value_t = REFRESH_TOKEN_DURATION_SECS)]
    pub refresh_ttl_secs: u64,

    /// Argon2 memory cost in KiB
    #[arg(long, default_value_t = argon2::Params::DEFAULT_M_COST)]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count
    #[arg(long, default_value_t = argon2::Params::DEFAULT_T_COST)]
    pub argon2_iterations: u32,

    /// Argon2 parallelism
    #[arg(long, default_value_t = argon2::Params::DEFAULT_P_COST)]
    pub argon2_parallelism: u32,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn validate_base_path(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Ok(String::new());
    }

    if !s.starts_with('/') {
        return Err(format!("Base path must start with '/': {}", s));
    }

    if s.len() > 1 && s.ends_with('/') {
        return Err(format!("Base path must not end with '/': {}", s));
    }

    if s.chars().any(|c| !c.is_ascii() || c.is_whitespace()) {
        return Err(format!("Base path contains invalid characters: {}", s));
    }

    Ok(s.to_string())
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        read_secret_file(path)?
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    check_secret_length(secret)
}

fn read_secret_file(path: &str) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content.trim().to_string()),
        Err(e) => {
            error!(path = %path, error = %e, "Failed to read JWT secret file");
            None
        }
    }
}

fn check_secret_length(secret: String) -> Option<String> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

/// Build ServerConfig from validated arguments.
/// Returns None and logs an error if a setting is out of range.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> Option<ServerConfig> {
    if args.access_ttl_secs == 0 || args.refresh_ttl_secs == 0 {
        error!("Token lifetimes must be greater than zero");
        return None;
    }

    if args.access_ttl_secs >= args.refresh_ttl_secs {
        warn!(
            access_ttl_secs = args.access_ttl_secs,
            refresh_ttl_secs = args.refresh_ttl_secs,
            "Access tokens outlive refresh tokens"
        );
    }

    let hasher = match Argon2Hasher::with_cost(
        args.argon2_memory_kib,
        args.argon2_iterations,
        args.argon2_parallelism,
    ) {
        Ok(hasher) => hasher,
        Err(e) => {
            error!(error = %e, "Invalid Argon2 settings");
            return None;
        }
    };

    if !args.secure_cookies {
        warn!("Refresh cookie is sent without the Secure flag");
    }

    Some(ServerConfig {
        base: args.base.clone(),
        db,
        jwt_secret: jwt_secret.into_bytes(),
        token_lifetimes: TokenLifetimes {
            access_secs: args.access_ttl_secs,
            refresh_secs: args.refresh_ttl_secs,
        },
        hasher,
        secure_cookies: args.secure_cookies,
    })
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_base_path() {
        assert_eq!(validate_base_path("").unwrap(), "");
        assert_eq!(validate_base_path("/auth").unwrap(), "/auth");
        assert!(validate_base_path("auth").is_err());
        assert!(validate_base_path("/auth/").is_err());
        assert!(validate_base_path("/a b").is_err());
    }

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["turnstile"]);
        assert_eq!(args.port, 7292);
        assert_eq!(args.database, "turnstile.db");
        assert_eq!(args.access_ttl_secs, ACCESS_TOKEN_DURATION_SECS);
        assert_eq!(args.refresh_ttl_secs, REFRESH_TOKEN_DURATION_SECS);
        assert!(args.base.is_none());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(check_secret_length("too-short".to_string()).is_none());
        assert!(check_secret_length("x".repeat(MIN_JWT_SECRET_LENGTH)).is_some());
    }

    #[test]
    fn test_secret_file_is_trimmed() {
        let path = std::env::temp_dir().join(format!("turnstile-secret-{}", uuid::Uuid::new_v4()));
        std::fs::write(&path, "  file-secret\n").unwrap();

        let secret = read_secret_file(path.to_str().unwrap());
        std::fs::remove_file(&path).ok();

        assert_eq!(secret.as_deref(), Some("file-secret"));
    }

    #[test]
    fn test_missing_secret_file() {
        assert!(read_secret_file("/nonexistent/turnstile/secret").is_none());
    }

    #[tokio::test]
    async fn test_build_config() {
        let db = Database::open(":memory:").await.unwrap();
        let args = Args::parse_from([
            "turnstile",
            "--base",
            "/auth",
            "--access-ttl-secs",
            "60",
            "--refresh-ttl-secs",
            "3600",
            "--secure-cookies",
        ]);

        let config = build_config(&args, db, "s".repeat(32)).unwrap();
        assert_eq!(config.base.as_deref(), Some("/auth"));
        assert_eq!(config.token_lifetimes.access_secs, 60);
        assert_eq!(config.token_lifetimes.refresh_secs, 3600);
        assert!(config.secure_cookies);
    }

    #[tokio::test]
    async fn test_build_config_rejects_zero_lifetime() {
        let db = Database::open(":memory:").await.unwrap();
        let args = Args::parse_from(["turnstile", "--access-ttl-secs", "0"]);

        assert!(build_config(&args, db, "s".repeat(32)).is_none());
    }
}
