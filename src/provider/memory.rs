//! In-process provider for tests and dry rehearsals.

use super::{DeleteOutcome, StackOutputs, StackProvider, StackRequest};
use crate::error::ProviderError;
use crate::parameters::ParameterSet;
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Calls observed by a [`MemoryProvider`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    CreateOrUpdate {
        stack_name: String,
        parameters: ParameterSet,
    },
    Delete {
        stack_name: String,
    },
}

#[derive(Debug, Default)]
struct MemoryState {
    stacks: IndexMap<String, StackOutputs>,
    calls: Vec<ProviderCall>,
    outputs: HashMap<String, IndexMap<String, String>>,
    fail_create: HashSet<String>,
    fail_delete: HashSet<String>,
}

#[derive(Debug)]
pub struct MemoryProvider {
    region: String,
    account: String,
    state: Mutex<MemoryState>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account: "000000000000".to_string(),
            state: Mutex::new(MemoryState::default()),
        }
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Outputs reported for `stack_name` on every successful apply.
    pub fn with_outputs<I, K, V>(self, stack_name: &str, outputs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.state.lock().outputs.insert(
            stack_name.to_string(),
            outputs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn fail_create_for(&self, stack_name: &str) {
        self.state.lock().fail_create.insert(stack_name.to_string());
    }

    pub fn fail_delete_for(&self, stack_name: &str) {
        self.state.lock().fail_delete.insert(stack_name.to_string());
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().calls.clone()
    }

    pub fn stack_names(&self) -> Vec<String> {
        self.state.lock().stacks.keys().cloned().collect()
    }

    pub fn has_stack(&self, stack_name: &str) -> bool {
        self.state.lock().stacks.contains_key(stack_name)
    }

    fn stack_id(&self, stack_name: &str) -> String {
        format!(
            "arn:aws:cloudformation:{}:{}:stack/{}/memory",
            self.region, self.account, stack_name
        )
    }
}

#[async_trait]
impl StackProvider for MemoryProvider {
    fn provider_name(&self) -> &str {
        "memory"
    }

    async fn create_or_update_stack(
        &self,
        request: &StackRequest,
    ) -> Result<StackOutputs, ProviderError> {
        let stack_id = self.stack_id(&request.stack_name);
        let mut state = self.state.lock();
        state.calls.push(ProviderCall::CreateOrUpdate {
            stack_name: request.stack_name.clone(),
            parameters: request.parameters.clone(),
        });

        if state.fail_create.contains(&request.stack_name) {
            return Err(ProviderError::OperationFailed {
                operation: "deploy".to_string(),
                stack: request.stack_name.clone(),
                message: "ROLLBACK_COMPLETE".to_string(),
            });
        }

        let outputs = StackOutputs {
            stack_id: Some(stack_id),
            region: Some(self.region.clone()),
            outputs: state
                .outputs
                .get(&request.stack_name)
                .cloned()
                .unwrap_or_default(),
        };
        state
            .stacks
            .insert(request.stack_name.clone(), outputs.clone());
        Ok(outputs)
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<DeleteOutcome, ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(ProviderCall::Delete {
            stack_name: stack_name.to_string(),
        });

        if state.fail_delete.contains(stack_name) {
            return Err(ProviderError::OperationFailed {
                operation: "delete-stack".to_string(),
                stack: stack_name.to_string(),
                message: "DELETE_FAILED".to_string(),
            });
        }

        state.stacks.shift_remove(stack_name);
        Ok(DeleteOutcome {
            stack_name: stack_name.to_string(),
        })
    }
}
