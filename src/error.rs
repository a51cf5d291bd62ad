//! Error types for the simplify deployment engine.

use crate::resolver::UnresolvedParameter;
use std::path::PathBuf;
use thiserror::Error;

/// Ledger storage errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger file {path:?} cannot be parsed ({reason}); refusing to touch it")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Ledger I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors raised by the remote provider. Surfaced verbatim, never retried.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{operation} failed for stack {stack}: {message}")]
    OperationFailed {
        operation: String,
        stack: String,
        message: String,
    },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// Errors raised by a registered deployment hook.
#[derive(Debug, Error)]
#[error("{stage} hook for {unit} failed: {message}")]
pub struct HookError {
    pub stage: String,
    pub unit: String,
    pub message: String,
}

/// Command-level errors surfaced to the top-level invocation.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unresolved parameters for {unit}: {}", describe_unresolved(.errors))]
    UnresolvedParameters {
        unit: String,
        errors: Vec<UnresolvedParameter>,
    },

    #[error("Remote operation failed: {0}")]
    RemoteOperation(#[from] ProviderError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("{unit} was applied remotely but the ledger was not updated: {source}")]
    LedgerWriteAfterRemote { unit: String, source: LedgerError },

    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("{failed} of {total} units could not be destroyed")]
    CleanupIncomplete {
        failed: usize,
        total: usize,
        summary: String,
    },
}

impl DeployError {
    /// True when the persisted ledger could not be understood.
    pub fn is_ledger_corruption(&self) -> bool {
        matches!(
            self,
            DeployError::Ledger(LedgerError::Corrupt { .. })
                | DeployError::LedgerWriteAfterRemote {
                    source: LedgerError::Corrupt { .. },
                    ..
                }
        )
    }
}

fn describe_unresolved(errors: &[UnresolvedParameter]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.name, e.param_type))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<config::ConfigError> for DeployError {
    fn from(err: config::ConfigError) -> Self {
        DeployError::ConfigError(err.to_string())
    }
}
