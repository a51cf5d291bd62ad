//! Provider driving the `aws cloudformation` command line.

use super::{region_from_stack_id, DeleteOutcome, StackOutputs, StackProvider, StackRequest};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

/// Default capabilities acknowledged on every deploy.
pub const DEFAULT_CAPABILITIES: &[&str] = &["CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"];

#[derive(Debug, Clone)]
pub struct AwsCliProvider {
    binary: String,
    profile: Option<String>,
    region: Option<String>,
    bucket: Option<String>,
    bucket_prefix: Option<String>,
    capabilities: Vec<String>,
}

impl Default for AwsCliProvider {
    fn default() -> Self {
        Self {
            binary: "aws".to_string(),
            profile: None,
            region: None,
            bucket: None,
            bucket_prefix: None,
            capabilities: DEFAULT_CAPABILITIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl AwsCliProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Artifact bucket used to upload large templates.
    pub fn with_bucket(mut self, bucket: Option<String>, prefix: Option<String>) -> Self {
        self.bucket = bucket;
        self.bucket_prefix = prefix;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        if let Some(region) = &self.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        args
    }

    pub fn deploy_args(&self, request: &StackRequest) -> Vec<String> {
        let mut args = vec![
            "cloudformation".to_string(),
            "deploy".to_string(),
            "--stack-name".to_string(),
            request.stack_name.clone(),
            "--template-file".to_string(),
            request.template_location.display().to_string(),
            "--no-fail-on-empty-changeset".to_string(),
        ];
        if !self.capabilities.is_empty() {
            args.push("--capabilities".to_string());
            args.extend(self.capabilities.iter().cloned());
        }
        if let Some(bucket) = &self.bucket {
            args.push("--s3-bucket".to_string());
            args.push(bucket.clone());
            if let Some(prefix) = &self.bucket_prefix {
                args.push("--s3-prefix".to_string());
                args.push(prefix.clone());
            }
        }
        if !request.parameters.is_empty() {
            args.push("--parameter-overrides".to_string());
            args.extend(
                request
                    .parameters
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, value)),
            );
        }
        args.extend(self.global_args());
        args
    }

    fn stack_args(&self, operation: &[&str], stack_name: &str) -> Vec<String> {
        let mut args: Vec<String> = std::iter::once("cloudformation")
            .chain(operation.iter().copied())
            .map(str::to_string)
            .collect();
        args.push("--stack-name".to_string());
        args.push(stack_name.to_string());
        args.extend(self.global_args());
        args
    }

    async fn run(
        &self,
        operation: &str,
        stack_name: &str,
        args: Vec<String>,
    ) -> Result<String, ProviderError> {
        debug!(binary = %self.binary, operation, stack = stack_name, "Invoking provider CLI");
        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(ProviderError::OperationFailed {
                operation: operation.to_string(),
                stack: stack_name.to_string(),
                message,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacks {
    #[serde(default)]
    stacks: Vec<DescribedStack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribedStack {
    stack_id: Option<String>,
    #[serde(default)]
    outputs: Vec<DescribedOutput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribedOutput {
    output_key: String,
    output_value: Option<String>,
}

/// Parse `describe-stacks --output json` into [`StackOutputs`].
pub fn parse_describe_stacks(body: &str) -> Result<StackOutputs, ProviderError> {
    let described: DescribeStacks = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("describe-stacks: {}", e)))?;
    let stack = described
        .stacks
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("describe-stacks returned no stack".to_string()))?;

    let region = stack.stack_id.as_deref().and_then(region_from_stack_id);
    let outputs = stack
        .outputs
        .into_iter()
        .map(|o| (o.output_key, o.output_value.unwrap_or_default()))
        .collect();

    Ok(StackOutputs {
        stack_id: stack.stack_id,
        region,
        outputs,
    })
}

#[async_trait]
impl StackProvider for AwsCliProvider {
    fn provider_name(&self) -> &str {
        "aws-cli"
    }

    async fn create_or_update_stack(
        &self,
        request: &StackRequest,
    ) -> Result<StackOutputs, ProviderError> {
        info!(stack = %request.stack_name, "Deploying stack");
        self.run("deploy", &request.stack_name, self.deploy_args(request))
            .await?;

        let mut args = self.stack_args(&["describe-stacks"], &request.stack_name);
        args.push("--output".to_string());
        args.push("json".to_string());
        let body = self
            .run("describe-stacks", &request.stack_name, args)
            .await?;

        let mut outputs = parse_describe_stacks(&body)?;
        if outputs.region.is_none() {
            outputs.region = self.region.clone();
        }
        Ok(outputs)
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<DeleteOutcome, ProviderError> {
        info!(stack = stack_name, "Deleting stack");
        self.run(
            "delete-stack",
            stack_name,
            self.stack_args(&["delete-stack"], stack_name),
        )
        .await?;
        self.run(
            "wait stack-delete-complete",
            stack_name,
            self.stack_args(&["wait", "stack-delete-complete"], stack_name),
        )
        .await?;
        Ok(DeleteOutcome {
            stack_name: stack_name.to_string(),
        })
    }
}
