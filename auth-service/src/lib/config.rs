use std::env;

use config::builder::ConfigBuilder as Builder;
use config::builder::DefaultState;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub hashing: HashingConfig,
    pub kafka: KafkaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Deadline applied to each inbound request
    pub request_timeout_ms: u64,
    /// Upper bound on requests handled at the same time
    pub max_in_flight_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
            max_in_flight_requests: 16,
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Token lifetime, e.g. "500ms", "15m", "1.5h", "7d"; a bare number is milliseconds
    pub expires_in: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl JwtConfig {
    /// Parsed token lifetime.
    pub fn ttl(&self) -> Result<chrono::Duration, ConfigError> {
        parse_duration(&self.expires_in)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HashingConfig {
    /// Argon2 time cost
    pub work_factor: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            work_factor: auth::DEFAULT_WORK_FACTOR,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub group_id: String,
    pub request_topic: String,
    /// Used when a request does not name its own reply topic
    pub reply_topic: String,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, KAFKA__BROKERS, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let builder = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::default().separator("__"));

        Self::from_builder(builder)
    }

    /// Build and validate configuration from an arbitrary set of sources.
    pub fn from_builder(builder: Builder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "jwt.secret is required and must not be empty".to_string(),
            ));
        }

        self.jwt.ttl()?;

        if self.hashing.work_factor == 0 {
            return Err(ConfigError::Message(
                "hashing.work_factor must be at least 1".to_string(),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "server.request_timeout_ms must be at least 1".to_string(),
            ));
        }

        if self.server.max_in_flight_requests == 0 {
            return Err(ConfigError::Message(
                "server.max_in_flight_requests must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.server.request_timeout_ms)
    }
}

/// Parse a token lifetime such as `"500ms"`, `"90s"`, `"15m"`, `"1.5h"`, `"7d"` or `"1y"`.
///
/// A bare number is read as milliseconds. Amounts may be fractional and a
/// year is 365.25 days. The result must be at least one millisecond.
pub fn parse_duration(raw: &str) -> Result<chrono::Duration, ConfigError> {
    let invalid = || ConfigError::Message(format!("Invalid duration: {:?}", raw));

    let trimmed = raw.trim();
    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (amount, unit) = trimmed.split_at(split_at);

    // Digits with at most one interior or leading point: "2", "1.5", ".5"
    let well_formed = amount.ends_with(|c: char| c.is_ascii_digit())
        && amount.matches('.').count() <= 1;
    if !well_formed {
        return Err(invalid());
    }
    let amount: f64 = amount.parse().map_err(|_| invalid())?;

    const SECOND: f64 = 1_000.0;
    const DAY: f64 = 24.0 * 60.0 * 60.0 * SECOND;
    let millis_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => SECOND,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0 * SECOND,
        "h" | "hr" | "hrs" | "hour" | "hours" => 60.0 * 60.0 * SECOND,
        "d" | "day" | "days" => DAY,
        "w" | "week" | "weeks" => 7.0 * DAY,
        "y" | "yr" | "yrs" | "year" | "years" => 365.25 * DAY,
        _ => return Err(invalid()),
    };

    let millis = (amount * millis_per_unit).round();
    if !millis.is_finite() || millis < 1.0 || millis >= i64::MAX as f64 {
        return Err(invalid());
    }

    chrono::Duration::try_milliseconds(millis as i64).ok_or_else(invalid)
}
