use thiserror::Error;

/// Hashing secret used when none is configured outside production.
pub const DEV_HASHING_SECRET: &str = "thisIsASecret";

/// Upper bound for a token lifetime (one year).
pub const MAX_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    Production,
    #[default]
    Staging,
}

impl Environment {
    pub fn name(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
        }
    }

    fn default_bind_address(&self) -> &'static str {
        match self {
            Environment::Production => "0.0.0.0:5000",
            Environment::Staging => "0.0.0.0:3000",
        }
    }
}

/// Shape of log output, chosen by `LOG_FORMAT` before the rest of the
/// configuration is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Google Cloud Logging structured entries
    Gcp,
    Json,
    #[default]
    Plain,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_lowercase).as_deref() {
            Some("gcp") => LogFormat::Gcp,
            Some("json") => LogFormat::Json,
            _ => LogFormat::Plain,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub security: SecurityConfig,
    pub server: ServerConfig,
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Root directory holding one subdirectory per collection
    pub data_dir: String,
}

#[derive(Clone)]
pub struct SecurityConfig {
    pub hashing_secret: String,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("hashing_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Interval of the expired-token sweep; `None` keeps expiry lazy
    pub cleanup_interval_seconds: Option<u64>,
    pub ttl_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_seconds: None,
            ttl_seconds: 3600, // 1 hour
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").map(|s| s.to_lowercase()).as_deref() {
            Some("production") => Environment::Production,
            _ => Environment::Staging,
        };

        let bind_address = lookup("BIND_ADDRESS")
            .unwrap_or_else(|| environment.default_bind_address().to_string());

        let data_dir = lookup("DATA_DIR").unwrap_or_else(|| "./.data".to_string());

        let hashing_secret = match lookup("HASHING_SECRET") {
            Some(secret) => secret,
            None if environment == Environment::Staging => DEV_HASHING_SECRET.to_string(),
            None => {
                return Err(ConfigError::ValidationError(
                    "HASHING_SECRET is required in production".to_string(),
                ))
            }
        };

        let ttl_seconds = match lookup("TOKEN_TTL_SECONDS") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!("TOKEN_TTL_SECONDS is not a number: {raw}"))
            })?,
            None => TokenConfig::default().ttl_seconds,
        };

        let cleanup_interval_seconds = lookup("TOKEN_CLEANUP_INTERVAL_SECONDS")
            .map(|raw| {
                raw.parse().map_err(|_| {
                    ConfigError::ValidationError(format!(
                        "TOKEN_CLEANUP_INTERVAL_SECONDS is not a number: {raw}"
                    ))
                })
            })
            .transpose()?;

        let config = Config {
            environment,
            security: SecurityConfig { hashing_secret },
            server: ServerConfig {
                bind_address,
                data_dir,
            },
            tokens: TokenConfig {
                cleanup_interval_seconds,
                ttl_seconds,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.hashing_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "HASHING_SECRET cannot be empty".to_string(),
            ));
        }

        if self.environment == Environment::Production
            && self.security.hashing_secret == DEV_HASHING_SECRET
        {
            return Err(ConfigError::ValidationError(
                "HASHING_SECRET must not be the development default in production".to_string(),
            ));
        }

        if self.tokens.ttl_seconds == 0 || self.tokens.ttl_seconds > MAX_TTL_SECONDS {
            return Err(ConfigError::ValidationError(format!(
                "TOKEN_TTL_SECONDS must be between 1 and {MAX_TTL_SECONDS}"
            )));
        }

        if self.tokens.cleanup_interval_seconds == Some(0) {
            return Err(ConfigError::ValidationError(
                "TOKEN_CLEANUP_INTERVAL_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.server.data_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "DATA_DIR cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
