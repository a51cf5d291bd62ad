//! Remote Stack Provider
//!
//! The deploy and cleanup orchestrators talk to the infrastructure backend only
//! through [`StackProvider`]. Errors are surfaced as-is; nothing here retries.

use crate::error::ProviderError;
use crate::parameters::ParameterSet;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod aws_cli;
pub mod memory;

pub use aws_cli::AwsCliProvider;
pub use memory::{MemoryProvider, ProviderCall};

/// A create-or-update request for one stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRequest {
    pub stack_name: String,
    pub parameters: ParameterSet,
    /// Local template file handed to the backend.
    pub template_location: PathBuf,
}

/// What the backend reports after a successful create-or-update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutputs {
    pub stack_id: Option<String>,
    pub region: Option<String>,
    pub outputs: IndexMap<String, String>,
}

impl StackOutputs {
    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub stack_name: String,
}

/// Infrastructure backend able to apply and delete stacks.
#[async_trait]
pub trait StackProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    /// Create the stack, or update it in place when it already exists.
    async fn create_or_update_stack(
        &self,
        request: &StackRequest,
    ) -> Result<StackOutputs, ProviderError>;

    async fn delete_stack(&self, stack_name: &str) -> Result<DeleteOutcome, ProviderError>;
}

/// Region segment of a CloudFormation stack ARN
/// (`arn:aws:cloudformation:<region>:<account>:stack/...`).
pub fn region_from_stack_id(stack_id: &str) -> Option<String> {
    let mut parts = stack_id.split(':');
    if parts.next() != Some("arn") {
        return None;
    }
    parts
        .nth(2)
        .filter(|region| !region.is_empty())
        .map(str::to_string)
}
