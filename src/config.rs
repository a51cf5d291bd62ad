//! Configuration System
//!
//! Layered configuration built with the `config` crate. Layers, lowest first:
//! built-in defaults, the global file, the workspace `simplify.toml`
//! (or `simplify.json`), `simplify.<env>.toml`, `SIMPLIFY__*` environment
//! variables, then command-line overrides.

use crate::error::DeployError;
use crate::hooks::ScriptHookConfig;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod placeholders;
mod sources;

pub use facade::{ConfigLoader, LoadOptions};
pub use placeholders::{expand_placeholders, PlaceholderContext};
pub use sources::global_file::global_config_path;

/// Base name of the workspace configuration files.
pub const WORKSPACE_CONFIG_NAME: &str = "simplify";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifyConfig {
    /// Prefix of every remote stack name.
    #[serde(default)]
    pub project_name: Option<String>,

    /// Credentials profile handed to the provider.
    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    /// Function deployed alongside the stacks, e.g. `resizer-${DEPLOYMENT_ENV}`.
    /// Seeds the `FunctionName` and `FunctionARN` parameters.
    #[serde(default)]
    pub function_name: Option<String>,

    /// Root of the ledger files.
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,

    /// Folder holding one sub-folder per unit (template and parameters snapshot).
    #[serde(default = "default_stack_folder")]
    pub stack_folder: PathBuf,

    /// Snapshot file name inside a unit folder, `.json` implied.
    #[serde(default = "default_parameters_file")]
    pub parameters_file: String,

    /// Rewrite the parameters snapshot after each successful resolution.
    #[serde(default)]
    pub save_parameters: bool,

    #[serde(default)]
    pub headless: bool,

    #[serde(default)]
    pub bucket: BucketConfig,

    #[serde(default)]
    pub provider: ProviderSettings,

    /// Script hooks keyed by unit name.
    #[serde(default)]
    pub hooks: HashMap<String, ScriptHookConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Artifact bucket used when templates must be uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Key prefix, e.g. `builds/${DATE_TODAY}`.
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider command line.
    #[serde(default = "default_provider_binary")]
    pub binary: String,

    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
}

fn default_output_folder() -> PathBuf {
    PathBuf::from(".simplify")
}

fn default_stack_folder() -> PathBuf {
    PathBuf::from(".")
}

fn default_parameters_file() -> String {
    "parameters".to_string()
}

fn default_provider_binary() -> String {
    "aws".to_string()
}

fn default_capabilities() -> Vec<String> {
    crate::provider::aws_cli::DEFAULT_CAPABILITIES
        .iter()
        .map(|c| c.to_string())
        .collect()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            binary: default_provider_binary(),
            capabilities: default_capabilities(),
        }
    }
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            profile: None,
            region: None,
            function_name: None,
            output_folder: default_output_folder(),
            stack_folder: default_stack_folder(),
            parameters_file: default_parameters_file(),
            save_parameters: false,
            headless: false,
            bucket: BucketConfig::default(),
            provider: ProviderSettings::default(),
            hooks: HashMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Field(String, String),
    Hook(String, String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Field(name, msg) => write!(f, "{}: {}", name, msg),
            ValidationError::Hook(unit, msg) => write!(f, "Hook '{}': {}", unit, msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl SimplifyConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(project) = &self.project_name {
            if project.chars().any(char::is_whitespace) {
                errors.push(ValidationError::Field(
                    "project_name".to_string(),
                    format!("'{}' must not contain whitespace", project),
                ));
            }
        }
        if self.output_folder.as_os_str().is_empty() {
            errors.push(ValidationError::Field(
                "output_folder".to_string(),
                "cannot be empty".to_string(),
            ));
        }
        if self.parameters_file.trim().is_empty() {
            errors.push(ValidationError::Field(
                "parameters_file".to_string(),
                "cannot be empty".to_string(),
            ));
        }
        if self.provider.binary.trim().is_empty() {
            errors.push(ValidationError::Field(
                "provider.binary".to_string(),
                "cannot be empty".to_string(),
            ));
        }

        let mut units: Vec<&String> = self.hooks.keys().collect();
        units.sort();
        for unit in units {
            let hook = &self.hooks[unit];
            let declared = [
                &hook.pre_creation,
                &hook.post_creation,
                &hook.pre_cleanup,
                &hook.post_cleanup,
            ];
            if declared
                .iter()
                .any(|c| c.as_deref().map(|c| c.trim().is_empty()).unwrap_or(false))
            {
                errors.push(ValidationError::Hook(
                    unit.clone(),
                    "hook commands cannot be empty".to_string(),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Expand `${VAR}` placeholders in every string setting.
    pub fn expand_placeholders(&mut self, context: &PlaceholderContext) -> Result<(), DeployError> {
        let expand_opt = |value: &mut Option<String>| -> Result<(), DeployError> {
            if let Some(v) = value.as_mut() {
                *v = expand_placeholders(v, context)?;
            }
            Ok(())
        };
        expand_opt(&mut self.project_name)?;
        expand_opt(&mut self.profile)?;
        expand_opt(&mut self.region)?;
        expand_opt(&mut self.function_name)?;
        expand_opt(&mut self.bucket.name)?;
        expand_opt(&mut self.bucket.key)?;

        self.output_folder = PathBuf::from(expand_placeholders(
            &self.output_folder.to_string_lossy(),
            context,
        )?);
        self.stack_folder = PathBuf::from(expand_placeholders(
            &self.stack_folder.to_string_lossy(),
            context,
        )?);
        self.parameters_file = expand_placeholders(&self.parameters_file, context)?;
        Ok(())
    }

    /// Anchor relative folders at the workspace root.
    pub fn resolve_paths(&mut self, workspace_root: &Path) {
        if self.output_folder.is_relative() {
            self.output_folder = workspace_root.join(&self.output_folder);
        }
        if self.stack_folder.is_relative() {
            self.stack_folder = workspace_root.join(&self.stack_folder);
        }
        if let Some(file) = self.logging.file.as_mut() {
            if file.is_relative() {
                *file = workspace_root.join(&*file);
            }
        }
    }

    /// Expand, anchor and validate in one step.
    pub fn finalize(
        mut self,
        workspace_root: &Path,
        context: &PlaceholderContext,
    ) -> Result<Self, DeployError> {
        self.expand_placeholders(context)?;
        self.resolve_paths(workspace_root);
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            DeployError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(self)
    }
}
