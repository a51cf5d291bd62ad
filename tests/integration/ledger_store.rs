//! Ledger files written by one invocation and read by the next

use super::test_utils::ledger_in;
use simplify::ledger::{LedgerEntry, STACK_ID_KEY};
use simplify::unit::UnitKind;
use tempfile::TempDir;

#[test]
fn test_environments_are_isolated() {
    let temp = TempDir::new().unwrap();
    let ledger = ledger_in(temp.path());
    ledger
        .upsert(Some("dev"), "Website", LedgerEntry::new(UnitKind::Stack, 1))
        .unwrap();
    ledger
        .upsert(Some("prod"), "Api", LedgerEntry::new(UnitKind::Stack, 2))
        .unwrap();

    assert_eq!(ledger.load(Some("dev")).unwrap().unit_names(), vec!["Website"]);
    assert_eq!(ledger.load(Some("prod")).unwrap().unit_names(), vec!["Api"]);
    assert!(ledger.load(None).unwrap().is_empty());
}

#[test]
fn test_hand_written_ledger_is_readable_and_kept_in_order() {
    let temp = TempDir::new().unwrap();
    let ledger = ledger_in(temp.path());
    let path = ledger.path_for(Some("demo"));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        r#"{
    "Zeta": {
        "LastUpdate": 1700000000000,
        "Type": "CF-Stack",
        "StackId": "arn:aws:cloudformation:eu-west-1:1:stack/Zeta-demo/x",
        "BucketName": "zeta-bucket"
    },
    "Alpha": {
        "FunctionArn": "arn:aws:lambda:eu-west-1:1:function:alpha"
    }
}"#,
    )
    .unwrap();

    let loaded = ledger.load(Some("demo")).unwrap();
    assert_eq!(loaded.unit_names(), vec!["Zeta", "Alpha"]);
    let zeta = loaded.get("Zeta").unwrap();
    assert_eq!(zeta.kind(), UnitKind::Stack);
    assert_eq!(zeta.output("BucketName"), Some("zeta-bucket"));
    assert_eq!(loaded.get("Alpha").unwrap().kind(), UnitKind::Function);

    // Adding a third unit leaves the existing entries unchanged and in order.
    ledger
        .upsert(
            Some("demo"),
            "Beta",
            LedgerEntry::new(UnitKind::Stack, 3).with_output(STACK_ID_KEY, "arn:beta"),
        )
        .unwrap();
    let reloaded = ledger.load(Some("demo")).unwrap();
    assert_eq!(reloaded.unit_names(), vec!["Zeta", "Alpha", "Beta"]);
    assert_eq!(reloaded.get("Zeta"), loaded.get("Zeta"));
}
