//! Deployment Orchestrator
//!
//! Drives one unit through
//! `ParametersPending -> ParametersResolved -> RemoteApplyInFlight -> Succeeded | Failed`.
//! The ledger is written only after the provider confirms the apply; any
//! failure before that point leaves it exactly as it was.

use crate::error::DeployError;
use crate::hooks::{HookContext, HookRegistry, HookStage};
use crate::ledger::{Ledger, LedgerEntry, LocalLedger, STACK_ID_KEY};
use crate::parameters::{layer, ParameterSet, ParametersSnapshot};
use crate::provider::{StackOutputs, StackProvider, StackRequest};
use crate::reconcile::InteractiveReconciler;
use crate::resolver::{ParameterResolver, Resolution};
use crate::template::LoadedTemplate;
use crate::unit::{DeploymentUnit, StackNaming, UnitKind};
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Parameter seeded from the selected environment.
pub const ENVIRONMENT_PARAMETER: &str = "Environment";

/// Parameter seeded from the configured function name.
pub const FUNCTION_NAME_PARAMETER: &str = "FunctionName";

/// Parameter seeded from the recorded ARN of the configured function.
pub const FUNCTION_ARN_PARAMETER: &str = "FunctionARN";

/// Output key under which function units record their ARN.
pub const FUNCTION_ARN_KEY: &str = "FunctionArn";

/// Output key recording the region a stack was applied in.
pub const REGION_KEY: &str = "Region";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeployPhase {
    ParametersPending,
    ParametersResolved,
    RemoteApplyInFlight,
    Succeeded,
    Failed,
}

/// Everything needed to deploy one unit.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub unit: DeploymentUnit,
    pub template: LoadedTemplate,
    /// Values given for this run (flags, `--parameters`).
    pub supplied: ParameterSet,
}

#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub unit: String,
    pub stack_name: String,
    pub parameters: ParameterSet,
    pub entry: LedgerEntry,
    pub phases: Vec<DeployPhase>,
}

/// Resolution preview produced without touching the provider.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub unit: String,
    pub stack_name: String,
    pub resolution: Resolution,
}

/// Where parameter snapshots live: `<stack_folder>/<unit>/<file_name>.json`.
#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    pub stack_folder: PathBuf,
    pub file_name: String,
    /// Rewrite the snapshot after a complete resolution.
    pub save: bool,
}

impl SnapshotSettings {
    fn for_unit(&self, unit: &str) -> ParametersSnapshot {
        ParametersSnapshot::for_unit(&self.stack_folder, unit, &self.file_name)
    }
}

pub struct DeploymentOrchestrator {
    provider: Arc<dyn StackProvider>,
    ledger: LocalLedger,
    hooks: HookRegistry,
    reconciler: Option<InteractiveReconciler>,
    naming: StackNaming,
    snapshots: Option<SnapshotSettings>,
    function_name: Option<String>,
    context: HookContext,
}

impl DeploymentOrchestrator {
    pub fn new(provider: Arc<dyn StackProvider>, ledger: LocalLedger) -> Self {
        let context = HookContext {
            output_folder: ledger.output_folder().to_path_buf(),
            ..Default::default()
        };
        Self {
            provider,
            ledger,
            hooks: HookRegistry::new(),
            reconciler: None,
            naming: StackNaming::default(),
            snapshots: None,
            function_name: None,
            context,
        }
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    /// Interactive mode. Without a reconciler the orchestrator is headless and
    /// unresolved parameters are fatal.
    pub fn with_reconciler(mut self, reconciler: InteractiveReconciler) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    pub fn with_project_name(mut self, project_name: Option<String>) -> Self {
        self.context.project_name = project_name.clone();
        self.naming = StackNaming::new(project_name);
        self
    }

    pub fn with_snapshots(mut self, snapshots: SnapshotSettings) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.context.region = region;
        self
    }

    /// Function deployed alongside the stacks; seeds `FunctionName` and `FunctionARN`.
    pub fn with_function_name(mut self, function_name: Option<String>) -> Self {
        self.function_name = function_name.filter(|name| !name.is_empty());
        self
    }

    pub fn ledger(&self) -> &LocalLedger {
        &self.ledger
    }

    /// Snapshot (lowest), environment and function seeds, then the caller's values.
    fn layered_supplied(
        &self,
        request: &DeployRequest,
        ledger: &Ledger,
    ) -> Result<ParameterSet, DeployError> {
        let mut supplied = match &self.snapshots {
            Some(settings) => settings.for_unit(&request.unit.name).load()?,
            None => ParameterSet::new(),
        };
        if let Some(env) = request.unit.environment().filter(|e| !e.is_empty()) {
            supplied.insert(ENVIRONMENT_PARAMETER.to_string(), env.to_string());
        }
        if let Some(function_name) = &self.function_name {
            supplied.insert(FUNCTION_NAME_PARAMETER.to_string(), function_name.clone());
            if let Some(arn) = function_arn(ledger, function_name) {
                supplied.insert(FUNCTION_ARN_PARAMETER.to_string(), arn.to_string());
            }
        }
        Ok(layer(supplied, &request.supplied))
    }

    /// Resolve the parameters a deploy would use, without side effects.
    pub fn plan(&self, request: &DeployRequest) -> Result<DeployPlan, DeployError> {
        let ledger = self.ledger.load(request.unit.environment())?;
        let supplied = self.layered_supplied(request, &ledger)?;
        let resolution = ParameterResolver::resolve(&request.template.spec, &supplied, &ledger);
        Ok(DeployPlan {
            unit: request.unit.name.clone(),
            stack_name: self
                .naming
                .stack_name(&request.unit.name, request.unit.environment()),
            resolution,
        })
    }

    pub async fn deploy(&self, request: DeployRequest) -> Result<DeployOutcome, DeployError> {
        let unit = &request.unit;
        let environment = unit.environment();
        let mut phases = vec![DeployPhase::ParametersPending];

        if unit.kind != UnitKind::Stack {
            return Err(DeployError::ConfigError(format!(
                "{} is a {} unit; only stacks can be deployed",
                unit.name, unit.kind
            )));
        }

        let mut context = self.context.clone();
        context.environment = unit.environment.clone();

        let ledger = self.ledger.load(environment)?;
        let template = &request.template.spec;
        let mut supplied = self.layered_supplied(&request, &ledger)?;
        let mut resolution = ParameterResolver::resolve(template, &supplied, &ledger);

        let hook = self.hooks.get(&unit.name);
        if let Some(hook) = hook.as_ref().filter(|h| h.handles(HookStage::PreCreation)) {
            info!(unit = %unit.name, stage = %HookStage::PreCreation, "Executing hook");
            let transformed = hook
                .pre_creation(
                    &context,
                    &unit.name,
                    resolution.resolved.clone(),
                    template,
                    &ledger,
                )
                .await?;
            // The hook's result is the whole supplied set from here on.
            supplied = transformed;
            resolution = ParameterResolver::resolve(template, &supplied, &ledger);
        } else {
            debug!(unit = %unit.name, stage = %HookStage::PreCreation, "Hook skipped");
        }

        let resolution = match &self.reconciler {
            Some(reconciler) => reconciler.reconcile(template, &supplied, &ledger, resolution)?,
            None if resolution.is_complete() => resolution,
            None => {
                return Err(DeployError::UnresolvedParameters {
                    unit: unit.name.clone(),
                    errors: resolution.errors,
                })
            }
        };
        phases.push(DeployPhase::ParametersResolved);
        debug!(unit = %unit.name, parameters = resolution.resolved.len(), "Parameters resolved");

        if let Some(settings) = self.snapshots.as_ref().filter(|s| s.save) {
            settings
                .for_unit(&unit.name)
                .save(&resolution.supplied_values())?;
        }

        let stack_name = self.naming.stack_name(&unit.name, environment);
        let stack_request = StackRequest {
            stack_name: stack_name.clone(),
            parameters: resolution.resolved.clone(),
            template_location: request.template.local_path.clone(),
        };

        phases.push(DeployPhase::RemoteApplyInFlight);
        info!(
            unit = %unit.name,
            stack = %stack_name,
            provider = self.provider.provider_name(),
            "Applying stack"
        );
        let result = match self.provider.create_or_update_stack(&stack_request).await {
            Ok(result) => result,
            Err(e) => {
                phases.push(DeployPhase::Failed);
                error!(unit = %unit.name, stack = %stack_name, error = %e, "Stack apply failed");
                return Err(e.into());
            }
        };

        let result = match hook.as_ref().filter(|h| h.handles(HookStage::PostCreation)) {
            Some(hook) => {
                info!(unit = %unit.name, stage = %HookStage::PostCreation, "Executing hook");
                hook.post_creation(&context, &unit.name, result).await?
            }
            None => {
                debug!(unit = %unit.name, stage = %HookStage::PostCreation, "Hook skipped");
                result
            }
        };

        let entry = ledger_entry(unit.kind, result);
        self.ledger
            .upsert(environment, &unit.name, entry.clone())
            .map_err(|source| DeployError::LedgerWriteAfterRemote {
                unit: unit.name.clone(),
                source,
            })?;
        phases.push(DeployPhase::Succeeded);
        info!(unit = %unit.name, stack = %stack_name, outputs = entry.outputs.len(), "Ledger updated");

        Ok(DeployOutcome {
            unit: unit.name.clone(),
            stack_name,
            parameters: resolution.resolved,
            entry,
            phases,
        })
    }
}

/// ARN of the function unit recorded under `function_name`, matched by unit
/// name or by its `FunctionName` output.
fn function_arn<'a>(ledger: &'a Ledger, function_name: &str) -> Option<&'a str> {
    ledger
        .iter()
        .filter(|(_, entry)| entry.kind() == UnitKind::Function)
        .find(|(name, entry)| {
            *name == function_name || entry.output(FUNCTION_NAME_PARAMETER) == Some(function_name)
        })
        .and_then(|(_, entry)| entry.output(FUNCTION_ARN_KEY))
}

fn ledger_entry(kind: UnitKind, result: StackOutputs) -> LedgerEntry {
    let mut entry = LedgerEntry::new(kind, Utc::now().timestamp_millis());
    if let Some(stack_id) = result.stack_id {
        entry = entry.with_output(STACK_ID_KEY, stack_id);
    }
    if let Some(region) = result.region {
        entry = entry.with_output(REGION_KEY, region);
    }
    entry.outputs.extend(result.outputs);
    entry
}
