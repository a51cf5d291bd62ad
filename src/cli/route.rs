//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cleanup::{CleanupOrchestrator, DestroyTarget};
use crate::config::{ConfigLoader, LoadOptions, PlaceholderContext, SimplifyConfig};
use crate::deploy::{DeployRequest, DeploymentOrchestrator, SnapshotSettings};
use crate::error::DeployError;
use crate::hooks::HookRegistry;
use crate::ledger::LocalLedger;
use crate::parameters::{layer, parse_parameter_pairs, read_parameters_argument, ParameterSet};
use crate::provider::aws_cli::AwsCliProvider;
use crate::provider::StackProvider;
use crate::reconcile::{InteractiveReconciler, Prompter, TerminalPrompter};
use crate::template::{LoadedTemplate, TemplateSource};
use crate::unit::DeploymentUnit;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::cli::parse::{Cli, Commands};
use crate::cli::presentation::{
    format_deploy_outcome, format_destroy_report, format_ledger_json, format_ledger_text,
    format_plan,
};
use crate::cli::{command_name, command_unit};

/// Options shared by every command, taken from the global flags.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub workspace: PathBuf,
    pub config: Option<PathBuf>,
    pub environment: Option<String>,
    pub region: Option<String>,
    pub profile: Option<String>,
}

impl From<&Cli> for GlobalOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            workspace: cli.workspace.clone(),
            config: cli.config.clone(),
            environment: cli.env.clone(),
            region: cli.region.clone(),
            profile: cli.profile.clone(),
        }
    }
}

/// Runtime context for CLI execution: resolved configuration and the provider.
pub struct RunContext {
    config: SimplifyConfig,
    workspace_root: PathBuf,
    environment: Option<String>,
    provider: Arc<dyn StackProvider>,
    runtime: tokio::runtime::Runtime,
}

impl RunContext {
    /// Load configuration for the workspace and build the default provider.
    pub fn new(options: &GlobalOptions) -> Result<Self, DeployError> {
        let mut load = LoadOptions::new(&options.workspace)
            .with_environment(options.environment.as_deref())
            .with_config_file(options.config.clone());
        if let Some(region) = &options.region {
            load = load.with_override("region", region.clone());
        }
        if let Some(profile) = &options.profile {
            load = load.with_override("profile", profile.clone());
        }
        let config = ConfigLoader::load_with(&load)?;
        let placeholders = PlaceholderContext::from_process(
            options.environment.as_deref(),
            config.region.as_deref(),
        );
        let config = config.finalize(&options.workspace, &placeholders)?;
        Self::from_config(config, options.workspace.clone(), options.environment.clone())
    }

    /// Build from an already finalized configuration.
    pub fn from_config(
        config: SimplifyConfig,
        workspace_root: PathBuf,
        environment: Option<String>,
    ) -> Result<Self, DeployError> {
        let provider: Arc<dyn StackProvider> = Arc::new(
            AwsCliProvider::new()
                .with_binary(config.provider.binary.clone())
                .with_profile(config.profile.clone())
                .with_region(config.region.clone())
                .with_bucket(config.bucket.name.clone(), config.bucket.key.clone())
                .with_capabilities(config.provider.capabilities.clone()),
        );
        let runtime = tokio::runtime::Runtime::new().map_err(|e| {
            DeployError::ConfigError(format!("Failed to start async runtime: {}", e))
        })?;
        Ok(Self {
            config,
            workspace_root,
            environment,
            provider,
            runtime,
        })
    }

    /// Replace the stack provider.
    pub fn with_provider(mut self, provider: Arc<dyn StackProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn config(&self) -> &SimplifyConfig {
        &self.config
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Execute a command and return its rendered output.
    pub fn execute(&self, command: &Commands) -> Result<String, DeployError> {
        let started = Instant::now();
        let name = command_name(command);
        info!(
            command = %name,
            unit = command_unit(command).unwrap_or("-"),
            environment = self.environment().unwrap_or("default"),
            "Command started"
        );
        let result = self.execute_inner(command);
        match &result {
            Ok(_) => info!(
                command = %name,
                duration_ms = started.elapsed().as_millis() as u64,
                "Command finished"
            ),
            Err(e) => warn!(
                command = %name,
                duration_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "Command failed"
            ),
        }
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, DeployError> {
        match command {
            Commands::Deploy {
                stack,
                template,
                location,
                parameters,
                param,
                headless,
                save_parameters,
            } => {
                let stack_folder = self.stack_folder(location.as_deref());
                let request = self.build_request(
                    stack,
                    template.as_deref(),
                    &stack_folder,
                    parameters.as_deref(),
                    param,
                )?;
                let mut orchestrator = self.deployment_orchestrator(
                    &stack_folder,
                    *save_parameters || self.config.save_parameters,
                );
                if !self.is_headless(*headless) {
                    orchestrator = orchestrator.with_reconciler(InteractiveReconciler::terminal());
                }
                let outcome = self.runtime.block_on(orchestrator.deploy(request))?;
                Ok(format_deploy_outcome(&outcome))
            }
            Commands::Plan {
                stack,
                template,
                location,
                parameters,
                param,
                format,
            } => {
                let stack_folder = self.stack_folder(location.as_deref());
                let request = self.build_request(
                    stack,
                    template.as_deref(),
                    &stack_folder,
                    parameters.as_deref(),
                    param,
                )?;
                let plan = self
                    .deployment_orchestrator(&stack_folder, false)
                    .plan(&request)?;
                format_plan(&plan, format)
            }
            Commands::Destroy {
                stack,
                location,
                yes,
                headless,
            } => {
                let target = DestroyTarget::parse(stack);
                if target == DestroyTarget::All && !*yes {
                    if self.is_headless(*headless) {
                        return Err(DeployError::ConfigError(
                            "Destroying every unit requires --yes when running headless"
                                .to_string(),
                        ));
                    }
                    let prompt = format!(
                        "Destroy every unit recorded for the {} environment?",
                        self.environment().unwrap_or("default")
                    );
                    if !TerminalPrompter.confirm(&prompt, false)? {
                        return Ok("Aborted".to_string());
                    }
                }

                let stack_folder = self.stack_folder(location.as_deref());
                let orchestrator =
                    CleanupOrchestrator::new(Arc::clone(&self.provider), self.ledger())
                        .with_hooks(self.hooks(&stack_folder))
                        .with_project_name(self.config.project_name.clone())
                        .with_region(self.config.region.clone());
                let report = self
                    .runtime
                    .block_on(orchestrator.run(&target, self.environment()))?;
                let summary = format_destroy_report(&report);
                if !report.is_success() {
                    return Err(DeployError::CleanupIncomplete {
                        failed: report.failed().count(),
                        total: report.units.len(),
                        summary,
                    });
                }
                Ok(summary)
            }
            Commands::List { format } => {
                let ledger = self.ledger().load(self.environment())?;
                if format == "json" {
                    format_ledger_json(&ledger)
                } else {
                    Ok(format_ledger_text(&ledger, self.environment()))
                }
            }
        }
    }

    fn ledger(&self) -> LocalLedger {
        LocalLedger::new(&self.config.output_folder)
    }

    fn stack_folder(&self, location: Option<&Path>) -> PathBuf {
        match location {
            Some(path) if path.is_relative() => self.workspace_root.join(path),
            Some(path) => path.to_path_buf(),
            None => self.config.stack_folder.clone(),
        }
    }

    fn hooks(&self, stack_folder: &Path) -> HookRegistry {
        HookRegistry::from_config(&self.config.hooks, stack_folder.to_path_buf())
    }

    /// Explicit flag, config, or no terminal on stdin.
    fn is_headless(&self, flag: bool) -> bool {
        flag || self.config.headless || !std::io::stdin().is_terminal()
    }

    fn deployment_orchestrator(&self, stack_folder: &Path, save: bool) -> DeploymentOrchestrator {
        DeploymentOrchestrator::new(Arc::clone(&self.provider), self.ledger())
            .with_hooks(self.hooks(stack_folder))
            .with_project_name(self.config.project_name.clone())
            .with_region(self.config.region.clone())
            .with_function_name(self.config.function_name.clone())
            .with_snapshots(SnapshotSettings {
                stack_folder: stack_folder.to_path_buf(),
                file_name: self.config.parameters_file.clone(),
                save,
            })
    }

    fn build_request(
        &self,
        unit: &str,
        template: Option<&str>,
        stack_folder: &Path,
        parameters: Option<&str>,
        pairs: &[String],
    ) -> Result<DeployRequest, DeployError> {
        let source = match template {
            Some(location) => TemplateSource::parse(location),
            None => TemplateSource::for_unit(stack_folder, unit),
        };
        let cache_dir = self.config.output_folder.join("templates");
        let template = self
            .runtime
            .block_on(LoadedTemplate::load(source, unit, &cache_dir))?;

        let from_argument = match parameters {
            Some(argument) => read_parameters_argument(argument)?,
            None => ParameterSet::new(),
        };
        let supplied = layer(from_argument, &parse_parameter_pairs(pairs)?);

        Ok(DeployRequest {
            unit: DeploymentUnit::stack(unit, self.environment.clone()),
            template,
            supplied,
        })
    }
}
