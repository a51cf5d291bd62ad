//! Deployment Hooks
//!
//! Optional per-unit extensions around the deploy and cleanup steps. Hooks are
//! registered explicitly in a [`HookRegistry`] and handed to the orchestrators;
//! a unit without a hook, or a hook without a given stage, behaves as identity.

use crate::error::HookError;
use crate::ledger::Ledger;
use crate::parameters::ParameterSet;
use crate::provider::{DeleteOutcome, StackOutputs};
use crate::template::TemplateSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub mod script;

pub use script::{ScriptHook, ScriptHookConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookStage {
    PreCreation,
    PostCreation,
    PreCleanup,
    PostCleanup,
}

impl HookStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::PreCreation => "pre-creation",
            HookStage::PostCreation => "post-creation",
            HookStage::PreCleanup => "pre-cleanup",
            HookStage::PostCleanup => "post-cleanup",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invocation context shared by every hook stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookContext {
    pub environment: Option<String>,
    pub region: Option<String>,
    pub project_name: Option<String>,
    pub output_folder: PathBuf,
}

/// Per-unit extension. Every stage defaults to identity.
#[async_trait]
pub trait DeploymentHook: Send + Sync {
    /// Whether this hook acts at `stage`. Unhandled stages are skipped.
    fn handles(&self, _stage: HookStage) -> bool {
        false
    }

    /// Transform the resolved parameters before the remote apply. The result
    /// replaces the supplied set and is resolved again, so a dropped key falls
    /// back to the ledger or the template default.
    async fn pre_creation(
        &self,
        _context: &HookContext,
        _unit: &str,
        parameters: ParameterSet,
        _template: &TemplateSpec,
        _ledger: &Ledger,
    ) -> Result<ParameterSet, HookError> {
        Ok(parameters)
    }

    /// Transform or enrich the provider's outputs before they are recorded.
    async fn post_creation(
        &self,
        _context: &HookContext,
        _unit: &str,
        result: StackOutputs,
    ) -> Result<StackOutputs, HookError> {
        Ok(result)
    }

    /// Name of the unit to delete instead, or `None` to veto the deletion.
    async fn pre_cleanup(
        &self,
        _context: &HookContext,
        unit: &str,
        _ledger: &Ledger,
    ) -> Result<Option<String>, HookError> {
        Ok(Some(unit.to_string()))
    }

    /// Transform the deletion result before it is reported.
    async fn post_cleanup(
        &self,
        _context: &HookContext,
        _unit: &str,
        _ledger: &Ledger,
        outcome: &DeleteOutcome,
    ) -> Result<DeleteOutcome, HookError> {
        Ok(outcome.clone())
    }
}

/// Hooks keyed by unit name.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn DeploymentHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, unit: impl Into<String>, hook: Arc<dyn DeploymentHook>) {
        self.hooks.insert(unit.into(), hook);
    }

    /// Exact match first, then case-insensitive; configuration keys may
    /// arrive lowercased.
    pub fn get(&self, unit: &str) -> Option<Arc<dyn DeploymentHook>> {
        self.hooks
            .get(unit)
            .or_else(|| {
                self.hooks
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(unit))
                    .map(|(_, hook)| hook)
            })
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Build script hooks from the `[hooks.<unit>]` configuration tables.
    pub fn from_config<'a, I>(hooks: I, working_dir: PathBuf) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a ScriptHookConfig)>,
    {
        let mut registry = Self::new();
        for (unit, config) in hooks {
            registry.register(
                unit.clone(),
                Arc::new(ScriptHook::new(config.clone(), working_dir.clone())),
            );
        }
        registry
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut units: Vec<&String> = self.hooks.keys().collect();
        units.sort();
        f.debug_struct("HookRegistry").field("units", &units).finish()
    }
}
