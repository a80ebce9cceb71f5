//! Configuration for monteq.
//!
//! All runtime-tunable parameters live here and arrive as one `Config` value
//! loaded from a TOML file. The core never reads the process environment
//! directly; credential `${VAR}` expansion happens in this layer when the
//! file is loaded.

use crate::models::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Top-level configuration for monteq.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Message broker connection settings
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Model distribution settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Simulation settings
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Broker connection settings.
///
/// The in-process transport only validates these; they are threaded into
/// `Broker::connect` so a networked transport can use them unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Broker username
    #[serde(default = "default_username")]
    pub username: String,

    /// Broker password; supports ${ENV_VAR} expansion
    #[serde(default = "default_password")]
    pub password: String,

    /// Maximum publish attempts before a channel error becomes fatal
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_endpoint() -> String {
    "inproc://montecarlo".to_string()
}

fn default_username() -> String {
    "guest".to_string()
}

fn default_password() -> String {
    "guest".to_string()
}

fn default_max_retries() -> u32 {
    3
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: default_username(),
            password: default_password(),
            max_retries: default_max_retries(),
        }
    }
}

/// Model distribution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// TTL for a published model, in seconds. After this elapses a new
    /// consumer observes no current model.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    3600
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of scenarios to generate when the CLI does not override it
    #[serde(default = "default_scenarios")]
    pub default_scenarios: u64,

    /// Number of workers the `run` command spawns
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// RNG seed for reproducible runs (None = seeded from entropy)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_scenarios() -> u64 {
    1000
}

fn default_workers() -> usize {
    4
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_scenarios: default_scenarios(),
            workers: default_workers(),
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, expanding `${VAR}` references in
    /// the broker password.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;

        config.broker.password = expand_env_vars(&config.broker.password);
        Ok(config)
    }

    /// Validate settings that every role depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax. If the variable is not set, the placeholder
/// is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();

    for cap in re.captures_iter(s) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}
