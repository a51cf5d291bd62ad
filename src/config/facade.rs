//! Configuration loader: assembles the layered sources and deserializes them.

use super::merge::merge_policy::builder_with_defaults;
use super::sources::{global_file, workspace_file};
use super::SimplifyConfig;
use config::{ConfigError, Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of configuration environment variables (`SIMPLIFY__REGION`, ...).
pub const ENV_PREFIX: &str = "SIMPLIFY";

#[derive(Debug, Clone)]
enum GlobalFile {
    Default,
    Path(PathBuf),
    Disabled,
}

/// Inputs of one configuration load.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    workspace_root: PathBuf,
    environment: Option<String>,
    config_file: Option<PathBuf>,
    global_file: GlobalFile,
    overrides: Vec<(String, String)>,
}

impl LoadOptions {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            environment: None,
            config_file: None,
            global_file: GlobalFile::Default,
            overrides: Vec::new(),
        }
    }

    pub fn with_environment(mut self, environment: Option<&str>) -> Self {
        self.environment = environment.map(str::to_string);
        self
    }

    /// Use this file instead of the workspace files.
    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    pub fn with_global_file(mut self, path: PathBuf) -> Self {
        self.global_file = GlobalFile::Path(path);
        self
    }

    pub fn without_global_file(mut self) -> Self {
        self.global_file = GlobalFile::Disabled;
        self
    }

    /// Highest-precedence value for `key` (dotted path).
    pub fn with_override(mut self, key: &str, value: impl Into<String>) -> Self {
        self.overrides.push((key.to_string(), value.into()));
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the configuration for a workspace and environment.
    pub fn load(workspace_root: &Path, environment: Option<&str>) -> Result<SimplifyConfig, ConfigError> {
        Self::load_with(&LoadOptions::new(workspace_root).with_environment(environment))
    }

    /// Load from a single file plus environment variables.
    pub fn load_from_file(path: &Path) -> Result<SimplifyConfig, ConfigError> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        Self::load_with(
            &LoadOptions::new(parent)
                .with_config_file(Some(path.to_path_buf()))
                .without_global_file(),
        )
    }

    pub fn load_with(options: &LoadOptions) -> Result<SimplifyConfig, ConfigError> {
        let mut builder = builder_with_defaults()?;

        builder = match &options.global_file {
            GlobalFile::Default => global_file::add_to_builder(builder, global_file::global_config_path())?,
            GlobalFile::Path(path) => global_file::add_to_builder(builder, Some(path.clone()))?,
            GlobalFile::Disabled => builder,
        };

        builder = match &options.config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                builder.add_source(File::from(path.as_path()).required(true))
            }
            None => workspace_file::add_to_builder(
                builder,
                &options.workspace_root,
                options.environment.as_deref(),
            )?,
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        for (key, value) in &options.overrides {
            builder = builder.set_override(key.as_str(), value.as_str())?;
        }

        let config: SimplifyConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace = %options.workspace_root.display(),
            environment = ?options.environment,
            "Configuration loaded"
        );
        Ok(config)
    }
}
