//! API configuration.

use std::time::Duration;

use vscore_music::PollConfig;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size (scripts plus inline video bytes)
    pub max_body_size: usize,
    /// Wall-clock deadline for one whole analysis + generation pipeline
    pub generation_timeout: Duration,
    /// Polling behavior for the music gateway
    pub poll: PollConfig,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 25 * 1024 * 1024, // 25MB
            generation_timeout: Duration::from_secs(600),
            poll: PollConfig::default(),
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let poll = PollConfig::default()
            .with_max_attempts(env_parse("POLL_MAX_ATTEMPTS", 60))
            .with_interval(Duration::from_secs(env_parse("POLL_INTERVAL_SECS", 5)))
            .with_error_budget(env_parse("POLL_ERROR_BUDGET", 5))
            .with_success_grace_attempts(env_parse("POLL_SUCCESS_GRACE_ATTEMPTS", 5));

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT", defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: env_parse("MAX_BODY_SIZE", defaults.max_body_size),
            generation_timeout: Duration::from_secs(env_parse("GENERATION_TIMEOUT_SECS", 600)),
            poll,
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
