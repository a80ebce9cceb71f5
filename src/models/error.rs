//! Error types for monteq.
//!
//! The taxonomy mirrors how failures propagate through the system:
//! - Structural errors (model format, configuration) are fatal to the role
//!   that hits them.
//! - Channel errors are retried with bounded backoff at the producer/worker
//!   boundary and become fatal only after exhausting attempts.
//! - Per-message errors (evaluation, serialization) are contained: they cost
//!   one scenario or one payload, never the role.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for monteq.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("model format error: {0}")]
    ModelFormat(#[from] ModelFormatError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    #[error("failed to decode {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Model text parse failures. Each variant carries the offending line so the
/// producer can die with a message that points at the input.
#[derive(Debug, Error)]
pub enum ModelFormatError {
    #[error("no FUNCTION line found in model text")]
    MissingFunction,

    #[error("no VARIABLES section found in model text")]
    MissingVariables,

    #[error("unknown distribution kind '{kind}' in line {line:?}")]
    UnknownKind { kind: String, line: String },

    #[error("missing parameter '{param}' for {kind} in line {line:?}")]
    MissingParameter {
        kind: &'static str,
        param: &'static str,
        line: String,
    },

    #[error("invalid parameter value in line {line:?}")]
    InvalidValue { line: String },

    #[error("duplicate variable '{name}' in line {line:?}")]
    DuplicateVariable { name: String, line: String },

    #[error("invalid distribution in line {line:?}: {source}")]
    InvalidDistribution {
        line: String,
        #[source]
        source: ConfigError,
    },
}

/// Configuration failures: bad distribution parameter domains, unreadable or
/// unparsable config files, and invalid broker settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("normal distribution requires stddev > 0, got {0}")]
    InvalidStdDev(f64),

    #[error("uniform distribution requires min <= max, got min={min}, max={max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("exponential distribution requires lambda > 0, got {0}")]
    InvalidLambda(f64),

    #[error("triangular distribution requires left <= mode <= right, got left={left}, mode={mode}, right={right}")]
    InvalidTriangle { left: f64, mode: f64, right: f64 },

    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("broker endpoint must not be empty")]
    EmptyEndpoint,
}

/// Channel transport failures.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,

    #[error("transient channel failure: {0}")]
    Transient(String),

    #[error("publish failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Expression evaluation failures. Contained to the scenario being evaluated.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("parse error at byte {pos}: {message}")]
    Parse { pos: usize, message: String },

    #[error("'{0}' is not a whitelisted function")]
    UnknownFunction(String),

    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("expression produced a non-finite value ({0})")]
    NonFinite(f64),
}

impl SimError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a serialization error for a named payload kind.
    pub fn decode(what: &'static str, source: serde_json::Error) -> Self {
        Self::Serialization { what, source }
    }

    /// Whether the retry helper should take another attempt at this error.
    ///
    /// Only transient channel failures qualify; a closed channel is terminal
    /// and everything else is either structural or per-message.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Channel(ChannelError::Transient(_)))
    }
}

/// Result type alias for monteq.
pub type Result<T> = std::result::Result<T, SimError>;
