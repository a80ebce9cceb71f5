//! Parser for the model text format.
//!
//! ```text
//! FUNCTION: <expression>
//! VARIABLES:
//! <name>: <kind>(<param>=<value>, ...)
//! ```
//!
//! The expression is captured verbatim and not validated here; it is only
//! parsed when a worker evaluates a scenario. Variable definitions fail fast
//! with the offending line.

use crate::models::error::{ModelFormatError, Result, SimError};
use crate::models::spec::{Distribution, ModelSpec, Variable};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// Parse model text into a `ModelSpec`.
pub fn parse_model(text: &str) -> Result<ModelSpec> {
    let var_re = Regex::new(r"^(\w+):\s*(\w+)\s*\((.*)\)\s*$").unwrap();

    let mut expression: Option<String> = None;
    let mut in_variables = false;
    let mut variables: Vec<Variable> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let upper = line.to_ascii_uppercase();
        if upper.starts_with("FUNCTION:") {
            if expression.is_none() {
                expression = Some(line["FUNCTION:".len()..].trim().to_string());
            }
            continue;
        }
        if upper.starts_with("VARIABLES:") {
            in_variables = true;
            continue;
        }
        if !in_variables {
            continue;
        }

        // Lines in the VARIABLES section that don't look like a definition
        // are tolerated, matching the original format's leniency.
        let caps = match var_re.captures(line) {
            Some(c) => c,
            None => continue,
        };

        let name = caps[1].to_string();
        let kind = caps[2].to_string();
        let params = parse_params(&caps[3], line)?;

        if variables.iter().any(|v| v.name == name) {
            return Err(ModelFormatError::DuplicateVariable {
                name,
                line: line.to_string(),
            }
            .into());
        }

        let distribution = Distribution::from_kind(&kind, &params, line)?;
        variables.push(Variable::new(name, distribution));
    }

    let expression = expression.ok_or(ModelFormatError::MissingFunction)?;
    if variables.is_empty() {
        return Err(ModelFormatError::MissingVariables.into());
    }

    ModelSpec::new(expression, variables)
}

/// Parse a model from a text file. Read failures are fatal to the caller.
pub fn parse_model_file(path: &Path) -> Result<ModelSpec> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SimError::io(format!("reading model file {}", path.display()), e))?;
    parse_model(&text)
}

fn parse_params(text: &str, line: &str) -> Result<BTreeMap<String, f64>> {
    let mut params = BTreeMap::new();
    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = match part.split_once('=') {
            Some(kv) => kv,
            None => continue,
        };
        let value: f64 = value.trim().parse().map_err(|_| ModelFormatError::InvalidValue {
            line: line.to_string(),
        })?;
        params.insert(key.trim().to_string(), value);
    }
    Ok(params)
}
