//! Cleanup Orchestrator
//!
//! Deletes deployed units and forgets them in the ledger. A ledger entry is
//! removed only after the provider confirms the deletion.

use crate::error::DeployError;
use crate::hooks::{HookContext, HookRegistry, HookStage};
use crate::ledger::LocalLedger;
use crate::provider::StackProvider;
use crate::unit::{StackNaming, UnitKind};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which units a destroy command targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyTarget {
    Unit(String),
    /// Every stack recorded in the ledger when the command starts.
    All,
}

impl DestroyTarget {
    pub fn parse(value: &str) -> Self {
        if value.trim() == "*" {
            DestroyTarget::All
        } else {
            DestroyTarget::Unit(value.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DestroyStatus {
    Destroyed { stack_name: String },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub unit: String,
    #[serde(flatten)]
    pub status: DestroyStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DestroyReport {
    pub environment: Option<String>,
    pub units: Vec<UnitReport>,
}

impl DestroyReport {
    pub fn is_success(&self) -> bool {
        !self
            .units
            .iter()
            .any(|u| matches!(u.status, DestroyStatus::Failed { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &UnitReport> {
        self.units
            .iter()
            .filter(|u| matches!(u.status, DestroyStatus::Failed { .. }))
    }
}

pub struct CleanupOrchestrator {
    provider: Arc<dyn StackProvider>,
    ledger: LocalLedger,
    hooks: HookRegistry,
    naming: StackNaming,
    context: HookContext,
}

impl CleanupOrchestrator {
    pub fn new(provider: Arc<dyn StackProvider>, ledger: LocalLedger) -> Self {
        let context = HookContext {
            output_folder: ledger.output_folder().to_path_buf(),
            ..Default::default()
        };
        Self {
            provider,
            ledger,
            hooks: HookRegistry::new(),
            naming: StackNaming::default(),
            context,
        }
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_project_name(mut self, project_name: Option<String>) -> Self {
        self.context.project_name = project_name.clone();
        self.naming = StackNaming::new(project_name);
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.context.region = region;
        self
    }

    pub fn ledger(&self) -> &LocalLedger {
        &self.ledger
    }

    pub async fn run(
        &self,
        target: &DestroyTarget,
        environment: Option<&str>,
    ) -> Result<DestroyReport, DeployError> {
        match target {
            DestroyTarget::Unit(unit) => {
                let report = self.destroy(unit, environment).await?;
                Ok(DestroyReport {
                    environment: environment.map(str::to_string),
                    units: vec![report],
                })
            }
            DestroyTarget::All => self.destroy_all(environment).await,
        }
    }

    /// Destroy one unit. Errors are returned; the ledger is untouched unless
    /// the provider deletion succeeded.
    pub async fn destroy(
        &self,
        unit: &str,
        environment: Option<&str>,
    ) -> Result<UnitReport, DeployError> {
        let mut context = self.context.clone();
        context.environment = environment.map(str::to_string);

        let ledger = self.ledger.load(environment)?;
        if !ledger.contains(unit) {
            warn!(unit, "Unit not recorded in the ledger, deleting by name");
        }

        let hook = self.hooks.get(unit);
        let target = match hook.as_ref().filter(|h| h.handles(HookStage::PreCleanup)) {
            Some(hook) => {
                info!(unit, stage = %HookStage::PreCleanup, "Executing hook");
                hook.pre_cleanup(&context, unit, &ledger).await?
            }
            None => {
                debug!(unit, stage = %HookStage::PreCleanup, "Hook skipped");
                Some(unit.to_string())
            }
        };
        let Some(target) = target else {
            info!(unit, "Deletion vetoed by pre-cleanup hook");
            return Ok(UnitReport {
                unit: unit.to_string(),
                status: DestroyStatus::Skipped {
                    reason: "vetoed by pre-cleanup hook".to_string(),
                },
            });
        };

        let stack_name = self.naming.stack_name(&target, environment);
        info!(unit = %target, stack = %stack_name, provider = self.provider.provider_name(), "Deleting stack");
        let outcome = self.provider.delete_stack(&stack_name).await.map_err(|e| {
            error!(unit = %target, stack = %stack_name, error = %e, "Stack deletion failed");
            DeployError::from(e)
        })?;

        let remaining = self.ledger.remove(environment, &target).map_err(|source| {
            DeployError::LedgerWriteAfterRemote {
                unit: target.clone(),
                source,
            }
        })?;

        let outcome = match hook.as_ref().filter(|h| h.handles(HookStage::PostCleanup)) {
            Some(hook) => {
                info!(unit = %target, stage = %HookStage::PostCleanup, "Executing hook");
                hook.post_cleanup(&context, &target, &remaining, &outcome)
                    .await?
            }
            None => {
                debug!(unit = %target, stage = %HookStage::PostCleanup, "Hook skipped");
                outcome
            }
        };

        Ok(UnitReport {
            unit: target,
            status: DestroyStatus::Destroyed {
                stack_name: outcome.stack_name,
            },
        })
    }

    /// Destroy every stack recorded in the ledger. The unit list is taken once
    /// up front; each unit succeeds or fails on its own, and a unit already
    /// deleted through another unit's pre-cleanup redirect is not deleted
    /// again. Ledger corruption aborts the run.
    pub async fn destroy_all(&self, environment: Option<&str>) -> Result<DestroyReport, DeployError> {
        let snapshot: Vec<(String, UnitKind)> = self
            .ledger
            .load(environment)?
            .iter()
            .map(|(name, entry)| (name.to_string(), entry.kind()))
            .collect();
        info!(units = snapshot.len(), "Destroying all recorded units");

        let mut report = DestroyReport {
            environment: environment.map(str::to_string),
            units: Vec::with_capacity(snapshot.len()),
        };
        let mut destroyed: HashSet<String> = HashSet::new();

        for (unit, kind) in snapshot {
            if destroyed.contains(&unit) {
                debug!(unit = %unit, "Already destroyed in this run");
                report.units.push(UnitReport {
                    unit,
                    status: DestroyStatus::Skipped {
                        reason: "already destroyed in this run".to_string(),
                    },
                });
                continue;
            }
            if kind != UnitKind::Stack {
                debug!(unit = %unit, kind = %kind, "Skipping non-stack unit");
                report.units.push(UnitReport {
                    unit,
                    status: DestroyStatus::Skipped {
                        reason: format!("{} units are not deleted by the stack provider", kind),
                    },
                });
                continue;
            }

            match self.destroy(&unit, environment).await {
                Ok(unit_report) => {
                    if matches!(unit_report.status, DestroyStatus::Destroyed { .. }) {
                        destroyed.insert(unit_report.unit.clone());
                    }
                    report.units.push(unit_report)
                }
                Err(e) if e.is_ledger_corruption() => return Err(e),
                Err(e) => report.units.push(UnitReport {
                    unit,
                    status: DestroyStatus::Failed {
                        error: e.to_string(),
                    },
                }),
            }
        }

        Ok(report)
    }
}
