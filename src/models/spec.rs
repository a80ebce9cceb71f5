//! Model domain types: distributions, variables, and the model itself.
//!
//! A `ModelSpec` is constructed once by the producer and never mutated. Each
//! `Distribution` variant validates its own parameter domain at construction,
//! so a value that exists is always sampleable.

use crate::models::error::{ConfigError, ModelFormatError, SimError};
use std::collections::BTreeMap;

/// A parametric random-value generator.
#[derive(Debug, Clone, PartialEq)]
pub enum Distribution {
    Normal { mean: f64, stddev: f64 },
    Uniform { min: f64, max: f64 },
    Exponential { lambda: f64 },
    Triangular { left: f64, mode: f64, right: f64 },
}

impl Distribution {
    pub fn normal(mean: f64, stddev: f64) -> Result<Self, ConfigError> {
        if !stddev.is_finite() || stddev <= 0.0 {
            return Err(ConfigError::InvalidStdDev(stddev));
        }
        Ok(Self::Normal { mean, stddev })
    }

    /// `min == max` is accepted as a degenerate point mass.
    pub fn uniform(min: f64, max: f64) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(ConfigError::InvalidRange { min, max });
        }
        Ok(Self::Uniform { min, max })
    }

    /// `lambda` is the scale (mean) of the distribution, matching
    /// `numpy.random.exponential`.
    pub fn exponential(lambda: f64) -> Result<Self, ConfigError> {
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(ConfigError::InvalidLambda(lambda));
        }
        Ok(Self::Exponential { lambda })
    }

    pub fn triangular(left: f64, mode: f64, right: f64) -> Result<Self, ConfigError> {
        if !left.is_finite()
            || !mode.is_finite()
            || !right.is_finite()
            || left > mode
            || mode > right
        {
            return Err(ConfigError::InvalidTriangle { left, mode, right });
        }
        Ok(Self::Triangular { left, mode, right })
    }

    /// Wire name of this distribution's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Normal { .. } => "normal",
            Self::Uniform { .. } => "uniform",
            Self::Exponential { .. } => "exponential",
            Self::Triangular { .. } => "triangular",
        }
    }

    /// Wire parameter map of this distribution.
    pub fn params(&self) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        match *self {
            Self::Normal { mean, stddev } => {
                params.insert("media".to_string(), mean);
                params.insert("desviacion".to_string(), stddev);
            }
            Self::Uniform { min, max } => {
                params.insert("min".to_string(), min);
                params.insert("max".to_string(), max);
            }
            Self::Exponential { lambda } => {
                params.insert("lambda".to_string(), lambda);
            }
            Self::Triangular { left, mode, right } => {
                params.insert("left".to_string(), left);
                params.insert("mode".to_string(), mode);
                params.insert("right".to_string(), right);
            }
        }
        params
    }

    /// Build a distribution from its wire representation.
    ///
    /// `context` feeds the error message: the offending model-text line when
    /// parsing, or the variable name when decoding an envelope.
    pub fn from_kind(
        kind: &str,
        params: &BTreeMap<String, f64>,
        context: &str,
    ) -> Result<Self, ModelFormatError> {
        let get = |kind: &'static str, param: &'static str| {
            params
                .get(param)
                .copied()
                .ok_or(ModelFormatError::MissingParameter {
                    kind,
                    param,
                    line: context.to_string(),
                })
        };

        let built = match kind.to_ascii_lowercase().as_str() {
            "normal" => {
                Distribution::normal(get("normal", "media")?, get("normal", "desviacion")?)
            }
            "uniform" => Distribution::uniform(get("uniform", "min")?, get("uniform", "max")?),
            "exponential" => Distribution::exponential(get("exponential", "lambda")?),
            "triangular" => Distribution::triangular(
                get("triangular", "left")?,
                get("triangular", "mode")?,
                get("triangular", "right")?,
            ),
            other => {
                return Err(ModelFormatError::UnknownKind {
                    kind: other.to_string(),
                    line: context.to_string(),
                })
            }
        };

        built.map_err(|source| ModelFormatError::InvalidDistribution {
            line: context.to_string(),
            source,
        })
    }
}

/// A named model variable with its probability distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub distribution: Distribution,
}

impl Variable {
    pub fn new(name: impl Into<String>, distribution: Distribution) -> Self {
        Self {
            name: name.into(),
            distribution,
        }
    }
}

/// The mathematical model: a function expression over named random variables.
///
/// The expression is plain text here; it is parsed and evaluated lazily, per
/// scenario, by the restricted interpreter in `sim::expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    expression: String,
    variables: Vec<Variable>,
}

impl ModelSpec {
    /// Build a model, enforcing that variable names are unique.
    pub fn new(expression: impl Into<String>, variables: Vec<Variable>) -> Result<Self, SimError> {
        let mut seen = std::collections::HashSet::new();
        for var in &variables {
            if !seen.insert(var.name.as_str()) {
                return Err(ModelFormatError::DuplicateVariable {
                    name: var.name.clone(),
                    line: var.name.clone(),
                }
                .into());
            }
        }
        Ok(Self {
            expression: expression.into(),
            variables,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}
