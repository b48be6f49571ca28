//! Server configuration

use shared::error::{AppError, ErrorCode};

/// Clinic server configuration, read from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,
    /// HTTP listen port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// HS256 secret for tenant JWTs
    pub jwt_secret: String,
    /// Connection pool size
    pub db_max_connections: u32,
    /// Minutes assumed per waiting position when estimating queue wait
    pub queue_slot_minutes: i64,
    /// Per-request timeout
    pub request_timeout_ms: u64,
    pub log_level: String,
    /// Daily-rolling log files are written here when set
    pub log_dir: Option<String>,
    pub log_json: bool,
}

impl Config {
    /// Require a secret env var: must be set and non-empty outside development.
    fn require_secret(name: &str, environment: &str) -> Result<String, AppError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(AppError::with_message(
                        ErrorCode::ConfigError,
                        format!("{name} must be set in {environment} environment"),
                    ));
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(AppError::with_message(
                ErrorCode::ConfigError,
                format!("{name} must not be empty in {environment} environment"),
            ));
        }
        Ok(val)
    }

    fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:clinic.db".into()),
            http_port: Self::parsed("HTTP_PORT", 8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            environment,
            db_max_connections: Self::parsed("DB_MAX_CONNECTIONS", 5),
            queue_slot_minutes: Self::parsed("QUEUE_SLOT_MINUTES", 30).max(1),
            request_timeout_ms: Self::parsed("REQUEST_TIMEOUT_MS", 30_000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            log_json: Self::parsed("LOG_JSON", false),
        })
    }

    /// In-memory configuration for tests and local tooling
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            http_port: 0,
            environment: "development".into(),
            jwt_secret: jwt_secret.into(),
            db_max_connections: 1,
            queue_slot_minutes: 30,
            request_timeout_ms: 30_000,
            log_level: "info".into(),
            log_dir: None,
            log_json: false,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
