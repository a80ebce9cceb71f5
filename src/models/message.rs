//! Wire payloads exchanged over the channels.
//!
//! All three channels carry JSON bytes; encode/decode lives at the role
//! boundary so malformed payloads surface as `SimError::Serialization` on
//! the consuming side, never inside the transport.

use crate::models::error::{Result, SimError};
use crate::models::spec::{Distribution, ModelSpec, Variable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// One variable in envelope form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireVariable {
    pub name: String,
    pub kind: String,
    pub params: BTreeMap<String, f64>,
}

/// The serialized model plus its time-to-live.
///
/// Exactly one envelope is logically "current" at a time; replacing it does
/// not affect workers that already cached a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEnvelope {
    pub expression: String,
    pub variables: Vec<WireVariable>,
    pub ttl_seconds: u64,
}

impl ModelEnvelope {
    pub fn from_spec(spec: &ModelSpec, ttl: Duration) -> Self {
        Self {
            expression: spec.expression().to_string(),
            variables: spec
                .variables()
                .iter()
                .map(|v| WireVariable {
                    name: v.name.clone(),
                    kind: v.distribution.kind().to_string(),
                    params: v.distribution.params(),
                })
                .collect(),
            ttl_seconds: ttl.as_secs(),
        }
    }

    /// Reconstruct the model, re-validating every distribution.
    pub fn into_spec(self) -> Result<ModelSpec> {
        let mut variables = Vec::with_capacity(self.variables.len());
        for wire in self.variables {
            let distribution = Distribution::from_kind(&wire.kind, &wire.params, &wire.name)?;
            variables.push(Variable::new(wire.name, distribution));
        }
        ModelSpec::new(self.expression, variables)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| SimError::decode("model envelope", e))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| SimError::decode("model envelope", e))
    }
}

/// One independent unit of work: a full set of sampled variable values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique, monotonically increasing within a producer run
    pub id: u64,

    /// Sampled value per variable name
    pub values: BTreeMap<String, f64>,
}

impl Scenario {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| SimError::decode("scenario", e))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| SimError::decode("scenario", e))
    }
}

/// The outcome of evaluating one scenario on one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMsg {
    pub scenario_id: u64,
    pub worker_id: String,
    pub value: f64,
}

impl ResultMsg {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| SimError::decode("result", e))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| SimError::decode("result", e))
    }
}
