//! Parameter sets and the per-unit parameters snapshot file.

use crate::error::DeployError;
use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parameter name to resolved value, in template declaration order.
pub type ParameterSet = IndexMap<String, String>;

/// Parse `KEY=VALUE` pairs given on the command line.
pub fn parse_parameter_pairs(pairs: &[String]) -> Result<ParameterSet, DeployError> {
    let mut parameters = ParameterSet::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            DeployError::ConfigError(format!(
                "Invalid parameter '{}': expected KEY=VALUE",
                pair
            ))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(DeployError::ConfigError(format!(
                "Invalid parameter '{}': empty name",
                pair
            )));
        }
        parameters.insert(key.to_string(), value.to_string());
    }
    Ok(parameters)
}

/// Parse a flat JSON object of parameters. Scalar values are stringified.
pub fn parse_parameters_json(content: &str) -> Result<ParameterSet, DeployError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| DeployError::ConfigError(format!("Invalid parameters JSON: {}", e)))?;
    let object = value.as_object().ok_or_else(|| {
        DeployError::ConfigError("Invalid parameters JSON: expected an object".to_string())
    })?;

    let mut parameters = ParameterSet::new();
    for (key, value) in object {
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => continue,
            _ => {
                return Err(DeployError::ConfigError(format!(
                    "Invalid parameters JSON: value of {} must be a scalar",
                    key
                )))
            }
        };
        parameters.insert(key.clone(), value);
    }
    Ok(parameters)
}

/// `--parameters` accepts inline JSON or `@path/to/file.json`.
pub fn read_parameters_argument(argument: &str) -> Result<ParameterSet, DeployError> {
    match argument.strip_prefix('@') {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|e| {
                DeployError::ConfigError(format!("Failed to read parameters file {}: {}", path, e))
            })?;
            parse_parameters_json(&content)
        }
        None => parse_parameters_json(argument),
    }
}

/// Layer `upper` on top of `lower`; keys in `upper` win.
pub fn layer(lower: ParameterSet, upper: &ParameterSet) -> ParameterSet {
    let mut merged = lower;
    for (key, value) in upper {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Snapshot of operator-supplied parameters for one unit:
/// `<stack_folder>/<unit>/<file_name>.json`.
#[derive(Debug, Clone)]
pub struct ParametersSnapshot {
    path: PathBuf,
}

impl ParametersSnapshot {
    pub fn for_unit(stack_folder: &Path, unit: &str, file_name: &str) -> Self {
        let file_name = if file_name.ends_with(".json") {
            file_name.to_string()
        } else {
            format!("{}.json", file_name)
        };
        Self {
            path: stack_folder.join(unit).join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Previous snapshot, or an empty set when there is none.
    pub fn load(&self) -> Result<ParameterSet, DeployError> {
        if !self.path.exists() {
            return Ok(ParameterSet::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            DeployError::ConfigError(format!(
                "Failed to read parameters snapshot {}: {}",
                self.path.display(),
                e
            ))
        })?;
        parse_parameters_json(&content).map_err(|e| {
            DeployError::ConfigError(format!("{} ({})", e, self.path.display()))
        })
    }

    pub fn save(&self, parameters: &ParameterSet) -> Result<(), DeployError> {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let content = serde_json::to_string_pretty(parameters)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            fs::write(&self.path, content)
        };
        write().map_err(|e| {
            DeployError::ConfigError(format!(
                "Failed to write parameters snapshot {}: {}",
                self.path.display(),
                e
            ))
        })?;
        debug!(path = %self.path.display(), count = parameters.len(), "Parameters snapshot written");
        Ok(())
    }
}
