//! Configuration layering as seen by a command invocation

use simplify::config::{ConfigLoader, LoadOptions, PlaceholderContext};
use simplify::hooks::{HookRegistry, HookStage};
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes tests that touch `SIMPLIFY__*` variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn write(dir: &std::path::Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_environment_file_and_placeholders_produce_final_config() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "simplify.toml",
        r#"
project_name = "shop"
region = "us-east-1"
output_folder = ".simplify/${DEPLOYMENT_ENV}"

[bucket]
name = "artifacts-${DEPLOYMENT_REGION}"

[hooks.Website]
post_creation = "cat"
"#,
    );
    write(temp.path(), "simplify.prod.toml", "region = \"eu-central-1\"\n");

    let options = LoadOptions::new(temp.path())
        .without_global_file()
        .with_environment(Some("prod"));
    let config = ConfigLoader::load_with(&options).unwrap();
    let context = PlaceholderContext::from_process(Some("prod"), config.region.as_deref());
    let config = config.finalize(temp.path(), &context).unwrap();

    assert_eq!(config.project_name.as_deref(), Some("shop"));
    assert_eq!(config.region.as_deref(), Some("eu-central-1"));
    assert_eq!(config.output_folder, temp.path().join(".simplify/prod"));
    assert_eq!(config.bucket.name.as_deref(), Some("artifacts-eu-central-1"));

    let hooks = HookRegistry::from_config(&config.hooks, temp.path().to_path_buf());
    let hook = hooks.get("Website").expect("hook registered from config");
    assert!(hook.handles(HookStage::PostCreation));
    assert!(!hook.handles(HookStage::PreCleanup));
}

#[test]
fn test_undefined_placeholder_is_rejected() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "simplify.toml", "project_name = \"${NOT_DEFINED_ANYWHERE}\"\n");

    let config = ConfigLoader::load_with(&LoadOptions::new(temp.path()).without_global_file())
        .unwrap();
    assert!(config
        .finalize(temp.path(), &PlaceholderContext::empty())
        .is_err());
}

#[test]
fn test_environment_variables_override_files() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    write(temp.path(), "simplify.toml", "parameters_file = \"from-file\"\n");

    std::env::set_var("SIMPLIFY__PARAMETERS_FILE", "from-env");
    let loaded = ConfigLoader::load_with(&LoadOptions::new(temp.path()).without_global_file());
    std::env::remove_var("SIMPLIFY__PARAMETERS_FILE");

    assert_eq!(loaded.unwrap().parameters_file, "from-env");
}

#[test]
fn test_explicit_config_file_replaces_workspace_files() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "simplify.toml", "project_name = \"workspace\"\n");
    write(temp.path(), "other.json", "{\"project_name\": \"explicit\"}");

    let config = ConfigLoader::load_with(
        &LoadOptions::new(temp.path())
            .without_global_file()
            .with_config_file(Some(temp.path().join("other.json"))),
    )
    .unwrap();
    assert_eq!(config.project_name.as_deref(), Some("explicit"));
}
