//! Workspace config file source: `simplify.toml` (or `simplify.json`) and `simplify.<env>.toml`

use crate::config::WORKSPACE_CONFIG_NAME;
use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;

const EXTENSIONS: &[&str] = &["toml", "json"];

/// Add workspace config files to builder.
/// Precedence: base file, then the environment-specific file.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
    environment: Option<&str>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder;

    if let Some(base) = first_existing(workspace_root, WORKSPACE_CONFIG_NAME) {
        builder = builder.add_source(File::from(base).required(false));
    }

    if let Some(env) = environment.filter(|e| !e.is_empty()) {
        let stem = format!("{}.{}", WORKSPACE_CONFIG_NAME, env);
        if let Some(env_file) = first_existing(workspace_root, &stem) {
            builder = builder.add_source(File::from(env_file).required(false));
        }
    }

    Ok(builder)
}

fn first_existing(root: &Path, stem: &str) -> Option<std::path::PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| root.join(format!("{}.{}", stem, ext)))
        .find(|path| path.exists())
}
