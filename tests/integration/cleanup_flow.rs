//! Destroy flows: ledger removal only after confirmed deletion

use super::test_utils::{ledger_bytes, ledger_in, ENV};
use async_trait::async_trait;
use simplify::cleanup::{CleanupOrchestrator, DestroyStatus, DestroyTarget};
use simplify::error::{DeployError, HookError};
use simplify::hooks::{DeploymentHook, HookContext, HookRegistry, HookStage};
use simplify::ledger::{Ledger, LedgerEntry, LocalLedger, STACK_ID_KEY};
use simplify::provider::{MemoryProvider, ProviderCall};
use simplify::unit::UnitKind;
use std::sync::Arc;
use tempfile::TempDir;

fn record(ledger: &LocalLedger, unit: &str, kind: UnitKind) {
    let mut entry = LedgerEntry::new(kind, 1);
    if kind == UnitKind::Stack {
        entry = entry.with_output(STACK_ID_KEY, format!("arn:stack/{}", unit));
    }
    ledger.upsert(Some(ENV), unit, entry).unwrap();
}

/// Deploys a new unit from inside post-cleanup to prove the wildcard run
/// works from the unit list taken at start.
struct AddsUnitOnCleanup {
    ledger: LocalLedger,
}

#[async_trait]
impl DeploymentHook for AddsUnitOnCleanup {
    fn handles(&self, stage: HookStage) -> bool {
        stage == HookStage::PostCleanup
    }

    async fn post_cleanup(
        &self,
        _context: &HookContext,
        _unit: &str,
        _ledger: &Ledger,
        outcome: &simplify::provider::DeleteOutcome,
    ) -> Result<simplify::provider::DeleteOutcome, HookError> {
        self.ledger
            .upsert(
                Some(ENV),
                "Late",
                LedgerEntry::new(UnitKind::Stack, 2).with_output(STACK_ID_KEY, "arn:late"),
            )
            .map(|_| outcome.clone())
            .map_err(|e| HookError {
                stage: HookStage::PostCleanup.to_string(),
                unit: "A".to_string(),
                message: e.to_string(),
            })
    }
}

#[tokio::test]
async fn test_wildcard_uses_units_recorded_at_start() {
    let temp = TempDir::new().unwrap();
    let ledger = ledger_in(temp.path());
    record(&ledger, "A", UnitKind::Stack);
    record(&ledger, "B", UnitKind::Stack);

    let mut hooks = HookRegistry::new();
    hooks.register(
        "A",
        Arc::new(AddsUnitOnCleanup {
            ledger: ledger.clone(),
        }),
    );
    let provider = Arc::new(MemoryProvider::new());
    let orchestrator =
        CleanupOrchestrator::new(provider.clone(), ledger.clone()).with_hooks(hooks);

    let report = orchestrator
        .run(&DestroyTarget::All, Some(ENV))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.units.len(), 2);
    assert_eq!(
        provider.calls(),
        vec![
            ProviderCall::Delete {
                stack_name: "A-demo".to_string()
            },
            ProviderCall::Delete {
                stack_name: "B-demo".to_string()
            },
        ]
    );
    let remaining = ledger.load(Some(ENV)).unwrap();
    assert_eq!(remaining.unit_names(), vec!["Late"]);
}

#[tokio::test]
async fn test_failed_delete_leaves_ledger_bytes_unchanged() {
    let temp = TempDir::new().unwrap();
    let ledger = ledger_in(temp.path());
    record(&ledger, "Website", UnitKind::Stack);
    let before = ledger_bytes(&ledger);

    let provider = Arc::new(MemoryProvider::new());
    provider.fail_delete_for("Website-demo");
    let orchestrator = CleanupOrchestrator::new(provider, ledger.clone());

    let err = orchestrator
        .run(&DestroyTarget::parse("Website"), Some(ENV))
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::RemoteOperation(_)));
    assert_eq!(ledger_bytes(&ledger), before);
}

#[tokio::test]
async fn test_wildcard_skips_functions_and_reports_failures() {
    let temp = TempDir::new().unwrap();
    let ledger = ledger_in(temp.path());
    record(&ledger, "Api", UnitKind::Stack);
    record(&ledger, "Handler", UnitKind::Function);
    record(&ledger, "Website", UnitKind::Stack);

    let provider = Arc::new(MemoryProvider::new());
    provider.fail_delete_for("Api-demo");
    let orchestrator = CleanupOrchestrator::new(provider, ledger.clone());

    let report = orchestrator.destroy_all(Some(ENV)).await.unwrap();
    assert!(!report.is_success());
    assert_eq!(report.failed().count(), 1);
    assert!(matches!(report.units[1].status, DestroyStatus::Skipped { .. }));
    assert!(matches!(report.units[2].status, DestroyStatus::Destroyed { .. }));

    let remaining = ledger.load(Some(ENV)).unwrap();
    assert_eq!(remaining.unit_names(), vec!["Api", "Handler"]);
}

#[tokio::test]
async fn test_corrupt_ledger_aborts_wildcard() {
    let temp = TempDir::new().unwrap();
    let ledger = ledger_in(temp.path());
    let path = ledger.path_for(Some(ENV));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let provider = Arc::new(MemoryProvider::new());
    let orchestrator = CleanupOrchestrator::new(provider.clone(), ledger);
    let err = orchestrator.destroy_all(Some(ENV)).await.unwrap_err();

    assert!(err.is_ledger_corruption());
    assert!(provider.calls().is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}
