//! Tests for axial-ledger: index assignment under concurrency, persistence, chain verification

use axial_core::Error;
use axial_ledger::*;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

// ===========================================================================
// Index assignment
// ===========================================================================

#[tokio::test]
async fn sequential_submissions_count_up_from_one() {
    let ledger = Ledger::in_memory();
    let a = ledger.submit(json!({"task": "refactor auth"})).await.unwrap();
    let b = ledger.submit(json!({"task": "write tests"})).await.unwrap();
    assert_eq!(a.index, 1);
    assert_eq!(b.index, 2);
    assert_eq!(b.previous_hash, a.hash);
}

#[tokio::test]
async fn identical_payloads_get_distinct_indices() {
    let ledger = Ledger::in_memory();
    let a = ledger.submit(json!({"task": "same"})).await.unwrap();
    let b = ledger.submit(json!({"task": "same"})).await.unwrap();
    assert_ne!(a.index, b.index);
    assert_ne!(a.hash, b.hash);
    assert_eq!(ledger.len().await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_get_gapless_unique_indices() {
    const N: u64 = 200;
    let ledger = Arc::new(Ledger::in_memory());

    let mut handles = Vec::new();
    for i in 0..N {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.submit(json!({"task": "load", "n": i})).await.unwrap().index
        }));
    }

    let mut indices = HashSet::new();
    for handle in handles {
        assert!(indices.insert(handle.await.unwrap()), "duplicate index");
    }
    let expected: HashSet<u64> = (FIRST_INDEX..FIRST_INDEX + N).collect();
    assert_eq!(indices, expected);
    assert!(ledger.verify().await);

    let entries = ledger.entries().await;
    assert!(entries.windows(2).all(|w| w[0].index + 1 == w[1].index));
}

#[tokio::test]
async fn malformed_payloads_are_rejected() {
    let ledger = Ledger::in_memory();
    for payload in [json!(null), json!([]), json!({}), json!(17)] {
        let err = ledger.submit(payload).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPlan(_)));
    }
    let ok = ledger.submit(json!({"task": "after failures"})).await.unwrap();
    assert_eq!(ok.index, 1);
}

// ===========================================================================
// Lookup
// ===========================================================================

#[tokio::test]
async fn get_and_query() {
    let ledger = Ledger::in_memory();
    ledger.submit(json!({"task": "refactor auth"})).await.unwrap();
    ledger.submit(json!({"task": "add metrics"})).await.unwrap();
    ledger.submit(json!({"task": "refactor billing"})).await.unwrap();

    assert_eq!(ledger.get(2).await.unwrap().payload["task"], "add metrics");

    let hits = ledger.query("refactor").await;
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].index, 3, "newest first");
    assert_eq!(hits[1].index, 1);

    assert_eq!(ledger.query("").await.len(), 3);
    assert!(ledger.query("deploy").await.is_empty());
}

// ===========================================================================
// Persistence
// ===========================================================================

#[tokio::test]
async fn reopen_continues_indices() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("ledger.jsonl");

    {
        let ledger = Ledger::open(&path).await.unwrap();
        ledger.submit(json!({"task": "one"})).await.unwrap();
        ledger.submit(json!({"task": "two"})).await.unwrap();
    }

    let ledger = Ledger::open(&path).await.unwrap();
    assert_eq!(ledger.len().await, 2);
    assert!(ledger.verify().await);
    let third = ledger.submit(json!({"task": "three"})).await.unwrap();
    assert_eq!(third.index, 3);
    assert_eq!(third.previous_hash, ledger.get(2).await.unwrap().hash);

    let lines = std::fs::read_to_string(&path).unwrap();
    assert_eq!(lines.lines().count(), 3);
}

#[tokio::test]
async fn tampered_file_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");

    {
        let ledger = Ledger::open(&path).await.unwrap();
        ledger.submit(json!({"task": "approve deploy"})).await.unwrap();
        ledger.submit(json!({"task": "deploy"})).await.unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replace("approve deploy", "skip approval")).unwrap();

    match Ledger::open(&path).await {
        Err(Error::LedgerCorrupt(msg)) => assert!(msg.contains("hash chain")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("tampered ledger opened"),
    }
}

#[tokio::test]
async fn unfinished_trailing_write_is_dropped_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");

    {
        let ledger = Ledger::open(&path).await.unwrap();
        ledger.submit(json!({"task": "one"})).await.unwrap();
        ledger.submit(json!({"task": "two"})).await.unwrap();
    }
    let intact = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, format!("{intact}{{\"index\":3,\"payload\":{{\"task\":\"thr")).unwrap();

    let ledger = Ledger::open(&path).await.unwrap();
    assert_eq!(ledger.len().await, 2);
    assert!(ledger.verify().await);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), intact);

    let next = ledger.submit(json!({"task": "three"})).await.unwrap();
    assert_eq!(next.index, 3);
    drop(ledger);
    assert_eq!(Ledger::open(&path).await.unwrap().len().await, 3);
}

#[tokio::test]
async fn garbage_line_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    std::fs::write(&path, "{not json}\n").unwrap();
    assert!(matches!(Ledger::open(&path).await, Err(Error::LedgerCorrupt(_))));
}

#[tokio::test]
async fn empty_file_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    std::fs::write(&path, "").unwrap();
    let ledger = Ledger::open(&path).await.unwrap();
    assert_eq!(ledger.head_hash().await, genesis_hash());
    assert_eq!(ledger.next_index().await, FIRST_INDEX);
    assert_eq!(ledger.path(), Some(path.as_path()));
}

// ===========================================================================
// Export
// ===========================================================================

#[tokio::test]
async fn export_writes_copy_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::open(dir.path().join("ledger.jsonl")).await.unwrap();
    ledger.submit(json!({"task": "one"})).await.unwrap();
    ledger.submit(json!({"task": "two"})).await.unwrap();

    let out = dir.path().join("exports").join("run-1");
    let manifest = ledger.export(&out).await.unwrap();
    assert_eq!(manifest.root_hash, ledger.head_hash().await);
    assert_eq!(manifest.entries, 2);
    assert_eq!((manifest.first_index, manifest.last_index), (Some(1), Some(2)));
    assert!(manifest.valid);

    let written: axial_core::ExportManifest =
        serde_json::from_str(&std::fs::read_to_string(out.join(EXPORT_MANIFEST_FILE)).unwrap()).unwrap();
    assert_eq!(written, manifest);

    let copy = Ledger::open(out.join(EXPORT_LEDGER_FILE)).await.unwrap();
    assert_eq!(copy.entries().await, ledger.entries().await);
}

#[tokio::test]
async fn export_of_empty_ledger_has_genesis_root() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = Ledger::in_memory().export(dir.path()).await.unwrap();
    assert_eq!(manifest.entries, 0);
    assert_eq!(manifest.root_hash, genesis_hash());
    assert_eq!(manifest.first_index, None);
    assert_eq!(std::fs::read_to_string(dir.path().join(EXPORT_LEDGER_FILE)).unwrap(), "");
}

#[tokio::test]
async fn export_refuses_to_overwrite_the_live_file() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::open(dir.path().join(EXPORT_LEDGER_FILE)).await.unwrap();
    ledger.submit(json!({"task": "keep me"})).await.unwrap();

    assert!(matches!(ledger.export(dir.path()).await, Err(Error::BadRequest(_))));
    assert_eq!(Ledger::open(dir.path().join(EXPORT_LEDGER_FILE)).await.unwrap().len().await, 1);
}
