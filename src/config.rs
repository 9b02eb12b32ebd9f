/// Service configuration
///
/// Loaded from a TOML file, then overridden from the environment (a `.env`
/// file is read first if present). Every field has a default, so a missing
/// file still yields a runnable configuration.
///
/// ```toml
/// [upstream]
/// endpoint = "http://localhost:8000/api/flood-data"
/// timeout_secs = 10
///
/// [refresh]
/// interval_secs = 300
/// max_age_minutes = 60
///
/// [simulation]
/// seed = 42
///
/// [logging]
/// level = "info"
/// file = "floodwatch.log"
/// timestamps = true
/// ```

use crate::acquire::DEFAULT_MAX_AGE_MINUTES;
use crate::ingest::flood_api::DEFAULT_FLOOD_DATA_URL;
use crate::logging::LogLevel;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "floodwatch.toml";

pub const ENV_DATA_URL: &str = "FLOOD_DATA_URL";
pub const ENV_REFRESH_SECS: &str = "FLOOD_REFRESH_SECS";
pub const ENV_SIM_SEED: &str = "FLOOD_SIM_SEED";
pub const ENV_LOG_LEVEL: &str = "FLOOD_LOG_LEVEL";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config read error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// When set, sites are fetched one by one from `{base}/{site_id}`
    /// instead of from the aggregated endpoint.
    pub per_site_base_url: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_FLOOD_DATA_URL.to_string(),
            timeout_secs: 10,
            per_site_base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub max_age_minutes: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 300, max_age_minutes: DEFAULT_MAX_AGE_MINUTES }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed jitter seed. Absent means seeded from entropy.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None, timestamps: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub upstream: UpstreamConfig,
    pub refresh: RefreshConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ServiceConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Loads `path` if it exists, defaults otherwise. A file that exists but
    /// does not parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads the file, applies `.env` and process environment overrides,
    /// and validates the result.
    pub fn from_env(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let mut config = Self::load_or_default(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value. Unset or empty variables leave the field alone.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_DATA_URL) {
            self.upstream.endpoint = url.trim().to_string();
        }
        if let Some(secs) = get(ENV_REFRESH_SECS) {
            self.refresh.interval_secs = secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{}='{}' is not a number", ENV_REFRESH_SECS, secs)))?;
        }
        if let Some(seed) = get(ENV_SIM_SEED) {
            let seed = seed
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{}='{}' is not a number", ENV_SIM_SEED, seed)))?;
            self.simulation.seed = Some(seed);
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.logging.level = level.trim().to_string();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.endpoint is empty".to_string()));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Invalid("upstream.timeout_secs must be > 0".to_string()));
        }
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::Invalid("refresh.interval_secs must be > 0".to_string()));
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<LogLevel, ConfigError> {
        self.logging.level.parse().map_err(ConfigError::Invalid)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }
}
