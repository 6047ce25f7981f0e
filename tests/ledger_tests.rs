mod support;

use seedpool::app::{PairState, WorkflowLedger, WorkflowOptions, LEDGER_VERSION};
use seedpool::error::Error;

use support::fixtures::{funded_chain, orchestrator, spec, token, ME};

#[tokio::test]
async fn ledger_survives_save_and_load() {
    let registered = spec(token("AAA", 0xaa), token("BBB", 0xbb));
    let phantom = spec(token("CCC", 0xcc), token("DDD", 0xdd));
    let chain = funded_chain(ME, &[&registered, &phantom]);
    chain.register_phantom(phantom.token_a().address, phantom.token_b().address);
    let ledger = orchestrator(&chain, WorkflowOptions::default())
        .run(&[registered.clone(), phantom.clone()], Some(31337))
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runs").join("ledger.json");
    ledger.save(&path).unwrap();

    assert!(!path.with_extension("tmp").exists());
    let loaded = WorkflowLedger::load(&path).unwrap();
    assert_eq!(loaded, ledger);
    assert_eq!(loaded.version, LEDGER_VERSION);
    assert_eq!(loaded.summary(), ledger.summary());
    assert_eq!(loaded.entry(registered.id()).unwrap().state, PairState::Registered);
    assert_eq!(
        loaded.entry(registered.id()).unwrap().transactions.len(),
        5
    );
}

#[test]
fn persisted_ledger_uses_readable_tags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let mut ledger = WorkflowLedger::new(Some(1));
    ledger.finish();
    ledger.save(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["version"], LEDGER_VERSION);
    assert_eq!(json["chain_id"], 1);
    assert!(json["entries"].as_array().unwrap().is_empty());
    assert!(json["finished_at"].is_string());
}

#[test]
fn loading_garbage_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(WorkflowLedger::load(&path), Err(Error::Json(_))));
    assert!(matches!(
        WorkflowLedger::load(&dir.path().join("missing.json")),
        Err(Error::Io(_))
    ));
}
