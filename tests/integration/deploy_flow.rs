//! End-to-end deploys against the in-memory provider

use super::test_utils::{ledger_bytes, ledger_in, request, string_template, ENV};
use simplify::deploy::{DeployPhase, DeploymentOrchestrator, SnapshotSettings};
use simplify::error::DeployError;
use simplify::ledger::STACK_ID_KEY;
use simplify::provider::{MemoryProvider, ProviderCall};
use simplify::reconcile::{Answer, InteractiveReconciler, ScriptedPrompter};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_environment_and_supplied_bucket_are_deployed() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(
        MemoryProvider::new().with_outputs("Website-demo", [("WebsiteURL", "http://b1.example")]),
    );
    let orchestrator = DeploymentOrchestrator::new(provider.clone(), ledger_in(temp.path()));

    let outcome = orchestrator
        .deploy(request(
            "Website",
            string_template(&["Environment", "BucketName"]),
            &[("BucketName", "b1")],
        ))
        .await
        .unwrap();

    assert_eq!(outcome.parameters["Environment"], ENV);
    assert_eq!(outcome.parameters["BucketName"], "b1");
    assert_eq!(
        outcome.phases,
        vec![
            DeployPhase::ParametersPending,
            DeployPhase::ParametersResolved,
            DeployPhase::RemoteApplyInFlight,
            DeployPhase::Succeeded,
        ]
    );

    let ledger = ledger_in(temp.path()).load(Some(ENV)).unwrap();
    let entry = ledger.get("Website").unwrap();
    assert!(entry.output(STACK_ID_KEY).unwrap().contains("Website-demo"));
    assert_eq!(entry.output("WebsiteURL"), Some("http://b1.example"));
    assert!(entry.last_update.is_some());
}

#[tokio::test]
async fn test_later_unit_resolves_from_earlier_outputs() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(
        MemoryProvider::new().with_outputs("Storage-demo", [("BucketName", "shared-bucket")]),
    );
    let orchestrator = DeploymentOrchestrator::new(provider.clone(), ledger_in(temp.path()));

    orchestrator
        .deploy(request("Storage", string_template(&["Environment"]), &[]))
        .await
        .unwrap();

    // `StorageBucketName` matches the composite key; `BucketName` the bare key.
    let outcome = orchestrator
        .deploy(request(
            "Website",
            string_template(&["StorageBucketName", "LogBucketName"]),
            &[],
        ))
        .await
        .unwrap();
    assert_eq!(outcome.parameters["StorageBucketName"], "shared-bucket");
    assert_eq!(outcome.parameters["LogBucketName"], "shared-bucket");

    let ledger = ledger_in(temp.path()).load(Some(ENV)).unwrap();
    assert_eq!(ledger.unit_names(), vec!["Storage", "Website"]);
}

#[tokio::test]
async fn test_failed_apply_leaves_ledger_bytes_unchanged() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(MemoryProvider::new());
    let orchestrator = DeploymentOrchestrator::new(provider.clone(), ledger_in(temp.path()));
    orchestrator
        .deploy(request("Storage", string_template(&[]), &[]))
        .await
        .unwrap();
    let before = ledger_bytes(orchestrator.ledger());

    provider.fail_create_for("Website-demo");
    let err = orchestrator
        .deploy(request("Website", string_template(&[]), &[]))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::RemoteOperation(_)));
    assert_eq!(ledger_bytes(orchestrator.ledger()), before);
}

#[tokio::test]
async fn test_unresolved_parameters_never_reach_the_provider() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(MemoryProvider::new());
    let orchestrator = DeploymentOrchestrator::new(provider.clone(), ledger_in(temp.path()));

    let err = orchestrator
        .deploy(request("Website", string_template(&["DomainName"]), &[]))
        .await
        .unwrap_err();

    match err {
        DeployError::UnresolvedParameters { unit, errors } => {
            assert_eq!(unit, "Website");
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].name, "DomainName");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(provider.calls().is_empty());
    assert!(ledger_bytes(orchestrator.ledger()).is_none());
}

#[tokio::test]
async fn test_interactive_answers_are_saved_as_snapshot() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(MemoryProvider::new());
    let prompter = ScriptedPrompter::new([
        // Environment: keep the seeded value.
        Answer::Input(ENV.to_string()),
        // DomainName is missing and the ledger is empty: free input.
        Answer::Input("example.org".to_string()),
        // Review: the last item confirms.
        Answer::Select(2),
    ]);
    let orchestrator = DeploymentOrchestrator::new(provider.clone(), ledger_in(temp.path()))
        .with_reconciler(InteractiveReconciler::new(Box::new(prompter)))
        .with_snapshots(SnapshotSettings {
            stack_folder: temp.path().to_path_buf(),
            file_name: "parameters".to_string(),
            save: true,
        });

    let outcome = orchestrator
        .deploy(request(
            "Website",
            string_template(&["Environment", "DomainName"]),
            &[],
        ))
        .await
        .unwrap();
    assert_eq!(outcome.parameters["DomainName"], "example.org");

    let snapshot = std::fs::read_to_string(temp.path().join("Website/parameters.json")).unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
    assert_eq!(snapshot["DomainName"], "example.org");

    match &provider.calls()[0] {
        ProviderCall::CreateOrUpdate { parameters, .. } => {
            assert_eq!(parameters["DomainName"], "example.org");
        }
        other => panic!("unexpected call: {:?}", other),
    }
}
