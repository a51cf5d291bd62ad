//! `${VAR}` expansion in configuration values.

use crate::error::DeployError;
use chrono::Local;
use std::collections::HashMap;

/// Variables visible to placeholder expansion.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderContext {
    vars: HashMap<String, String>,
}

impl PlaceholderContext {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Process environment plus `DEPLOYMENT_ENV`, `DEPLOYMENT_REGION` and `DATE_TODAY`.
    pub fn from_process(environment: Option<&str>, region: Option<&str>) -> Self {
        let mut context = Self {
            vars: std::env::vars().collect(),
        };
        if let Some(env) = environment {
            context.vars.insert("DEPLOYMENT_ENV".to_string(), env.to_string());
        }
        if let Some(region) = region {
            context
                .vars
                .insert("DEPLOYMENT_REGION".to_string(), region.to_string());
        }
        context.vars.insert(
            "DATE_TODAY".to_string(),
            Local::now().format("%Y-%m-%d").to_string(),
        );
        context
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Replace every `${NAME}`; an undefined name is a configuration error.
pub fn expand_placeholders(input: &str, context: &PlaceholderContext) -> Result<String, DeployError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            DeployError::ConfigError(format!("Unterminated placeholder in '{}'", input))
        })?;
        let name = &after[..end];
        let value = context.get(name).ok_or_else(|| {
            DeployError::ConfigError(format!("Undefined variable ${{{}}} in '{}'", name, input))
        })?;
        output.push_str(value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);
    Ok(output)
}
