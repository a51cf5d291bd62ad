//! Shell-command hooks declared in configuration.
//!
//! The command receives a JSON document on stdin and may answer with a JSON
//! document on stdout. Empty stdout keeps the input unchanged.
//!
//! | stage           | stdout                                   |
//! |-----------------|------------------------------------------|
//! | `pre_creation`  | flat object of parameters                |
//! | `post_creation` | flat object of outputs (replaces them)   |
//! | `pre_cleanup`   | `{"unit": "<name>"}`, `null` unit vetoes |
//! | `post_cleanup`  | `{"stack_name": "<name>"}`               |

use super::{DeploymentHook, HookContext, HookStage};
use crate::error::HookError;
use crate::ledger::Ledger;
use crate::parameters::{parse_parameters_json, ParameterSet};
use crate::provider::{DeleteOutcome, StackOutputs};
use crate::template::TemplateSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// `[hooks.<unit>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptHookConfig {
    #[serde(default)]
    pub pre_creation: Option<String>,
    #[serde(default)]
    pub post_creation: Option<String>,
    #[serde(default)]
    pub pre_cleanup: Option<String>,
    #[serde(default)]
    pub post_cleanup: Option<String>,
}

impl ScriptHookConfig {
    pub fn command_for(&self, stage: HookStage) -> Option<&str> {
        let command = match stage {
            HookStage::PreCreation => self.pre_creation.as_deref(),
            HookStage::PostCreation => self.post_creation.as_deref(),
            HookStage::PreCleanup => self.pre_cleanup.as_deref(),
            HookStage::PostCleanup => self.post_cleanup.as_deref(),
        };
        command.filter(|command| !command.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct ScriptHook {
    config: ScriptHookConfig,
    working_dir: PathBuf,
}

impl ScriptHook {
    pub fn new(config: ScriptHookConfig, working_dir: PathBuf) -> Self {
        Self {
            config,
            working_dir,
        }
    }

    /// Run the stage command, if any. `Ok(None)` means nothing to apply.
    async fn run(
        &self,
        stage: HookStage,
        context: &HookContext,
        unit: &str,
        payload: Value,
    ) -> Result<Option<Value>, HookError> {
        let Some(command) = self.config.command_for(stage) else {
            return Ok(None);
        };
        let fail = |message: String| HookError {
            stage: stage.to_string(),
            unit: unit.to_string(),
            message,
        };

        let document = json!({
            "stage": stage,
            "unit": unit,
            "context": context,
            "payload": payload,
        });
        let input = serde_json::to_vec(&document).map_err(|e| fail(e.to_string()))?;

        let mut cmd = shell_command(command);
        cmd.current_dir(&self.working_dir)
            .env("SIMPLIFY_HOOK_STAGE", stage.as_str())
            .env("SIMPLIFY_UNIT", unit)
            .env(
                "DEPLOYMENT_ENV",
                context.environment.as_deref().unwrap_or_default(),
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(stage = %stage, unit, command, "Running hook script");
        let mut child = cmd
            .spawn()
            .map_err(|e| fail(format!("cannot start '{}': {}", command, e)))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .await
                .map_err(|e| fail(format!("cannot write to '{}': {}", command, e)))?;
        }
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| fail(format!("'{}' did not complete: {}", command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(fail(format!("'{}' exited with {}: {}", command, output.status, stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(stdout.trim())
            .map(Some)
            .map_err(|e| fail(format!("invalid JSON on stdout: {}", e)))
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

#[async_trait]
impl DeploymentHook for ScriptHook {
    fn handles(&self, stage: HookStage) -> bool {
        self.config.command_for(stage).is_some()
    }

    async fn pre_creation(
        &self,
        context: &HookContext,
        unit: &str,
        parameters: ParameterSet,
        template: &TemplateSpec,
        ledger: &Ledger,
    ) -> Result<ParameterSet, HookError> {
        let payload = json!({
            "parameters": &parameters,
            "template": template,
            "ledger": ledger,
        });
        match self.run(HookStage::PreCreation, context, unit, payload).await? {
            None => Ok(parameters),
            Some(value) => parse_parameters_json(&value.to_string()).map_err(|e| HookError {
                stage: HookStage::PreCreation.to_string(),
                unit: unit.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn post_creation(
        &self,
        context: &HookContext,
        unit: &str,
        mut result: StackOutputs,
    ) -> Result<StackOutputs, HookError> {
        let payload = serde_json::to_value(&result).map_err(|e| HookError {
            stage: HookStage::PostCreation.to_string(),
            unit: unit.to_string(),
            message: e.to_string(),
        })?;
        if let Some(value) = self.run(HookStage::PostCreation, context, unit, payload).await? {
            result.outputs = parse_parameters_json(&value.to_string()).map_err(|e| HookError {
                stage: HookStage::PostCreation.to_string(),
                unit: unit.to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(result)
    }

    async fn pre_cleanup(
        &self,
        context: &HookContext,
        unit: &str,
        ledger: &Ledger,
    ) -> Result<Option<String>, HookError> {
        let payload = json!({ "ledger": ledger });
        match self.run(HookStage::PreCleanup, context, unit, payload).await? {
            None => Ok(Some(unit.to_string())),
            Some(value) => match value.get("unit") {
                Some(Value::String(name)) if !name.is_empty() => Ok(Some(name.clone())),
                Some(Value::Null) => Ok(None),
                _ => Err(HookError {
                    stage: HookStage::PreCleanup.to_string(),
                    unit: unit.to_string(),
                    message: "expected {\"unit\": <name or null>} on stdout".to_string(),
                }),
            },
        }
    }

    async fn post_cleanup(
        &self,
        context: &HookContext,
        unit: &str,
        ledger: &Ledger,
        outcome: &DeleteOutcome,
    ) -> Result<DeleteOutcome, HookError> {
        let payload = json!({ "ledger": ledger, "stack_name": outcome.stack_name });
        match self.run(HookStage::PostCleanup, context, unit, payload).await? {
            None => Ok(outcome.clone()),
            Some(value) => serde_json::from_value(value).map_err(|e| HookError {
                stage: HookStage::PostCleanup.to_string(),
                unit: unit.to_string(),
                message: format!("expected {{\"stack_name\": <name>}} on stdout: {}", e),
            }),
        }
    }
}
