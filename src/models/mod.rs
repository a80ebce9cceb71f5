//! Core data types: configuration, errors, the model, wire payloads, and
//! streaming statistics.

pub mod config;
pub mod error;
pub mod message;
pub mod spec;
pub mod stats;

pub use config::{BrokerConfig, Config, ModelConfig, SimulationConfig};
pub use error::{ChannelError, ConfigError, EvalError, ModelFormatError, Result, SimError};
pub use message::{ModelEnvelope, ResultMsg, Scenario, WireVariable};
pub use spec::{Distribution, ModelSpec, Variable};
pub use stats::{RunningStats, StatsSnapshot};
