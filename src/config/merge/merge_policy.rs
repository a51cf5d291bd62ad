//! Merge rules: built-in defaults, the bottom layer of every load.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("output_folder", ".simplify")?
        .set_default("stack_folder", ".")?
        .set_default("parameters_file", "parameters")?
        .set_default("save_parameters", false)?
        .set_default("headless", false)?
        .set_default("provider.binary", "aws")
}
