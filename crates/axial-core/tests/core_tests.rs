//! Tests for axial-core: types, plan schema, errors, config loading

use axial_core::plan;
use axial_core::*;
use serde_json::json;

// ===========================================================================
// GateStatus
// ===========================================================================

#[test]
fn gate_status_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&GateStatus::Pending).unwrap(), r#""pending""#);
    assert_eq!(serde_json::to_string(&GateStatus::Approved).unwrap(), r#""approved""#);
    assert_eq!(serde_json::to_string(&GateStatus::Rejected).unwrap(), r#""rejected""#);
}

#[test]
fn gate_status_from_decision() {
    assert_eq!(GateStatus::from_decision(true), GateStatus::Approved);
    assert_eq!(GateStatus::from_decision(false), GateStatus::Rejected);
    assert!(!GateStatus::Pending.is_resolved());
    assert!(GateStatus::Rejected.is_resolved());
    assert_eq!(GateStatus::Approved.to_string(), "approved");
}

// ===========================================================================
// Protocol
// ===========================================================================

#[test]
fn approval_request_wire_shape() {
    let req: ApprovalRequest = serde_json::from_str(r#"{"gate_id":"g1","approved":false}"#).unwrap();
    assert_eq!(req.gate_id, "g1");
    assert!(!req.approved);
}

#[test]
fn plan_response_wire_shape() {
    let resp = PlanResponse {
        ledger_index: 3,
        gates: vec![],
    };
    let value = serde_json::to_value(&resp).unwrap();
    assert_eq!(value["ledger_index"], 3);

    let parsed: PlanResponse = serde_json::from_str(r#"{"ledger_index": 9}"#).unwrap();
    assert_eq!(parsed.ledger_index, 9);
    assert!(parsed.gates.is_empty());
}

#[test]
fn route_request_strategy_is_optional() {
    let req: RouteRequest = serde_json::from_str(r#"{"task":"fix the login bug"}"#).unwrap();
    assert!(req.strategy.is_none());
    let json = serde_json::to_string(&req).unwrap();
    assert!(!json.contains("strategy"));
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn every_wire_code_rebuilds_the_same_code() {
    let errors = vec![
        Error::invalid_plan("expected a JSON object"),
        Error::GateNotFound("g9".into()),
        Error::already_resolved("g1", GateStatus::Approved),
        Error::DuplicateGateId("g1".into()),
        Error::InvalidGateId("".into()),
        Error::EmptyTask,
        Error::UnknownStrategy("fastest".into()),
        Error::routing_failed("executor 'ollama' timed out after 5s"),
        Error::DuplicateForkId("debug-auth-bug".into()),
        Error::InvalidForkId("a b".into()),
        Error::ForkNotFound("x".into()),
        Error::fork_failed("x", "git exited with 128"),
        Error::Unavailable("connection refused".into()),
        Error::BadRequest("missing field `task`".into()),
    ];
    for err in errors {
        let body = ErrorBody::from(&err);
        let rebuilt = body.clone().into_error();
        assert_eq!(rebuilt.code(), err.code(), "{}", err);
        assert_eq!(rebuilt.kind(), err.kind());
        assert_eq!(rebuilt.to_string(), err.to_string());
    }
}

#[test]
fn exit_codes_differ_per_kind() {
    let codes = [
        ErrorKind::InvalidRequest.exit_code(),
        ErrorKind::StateConflict.exit_code(),
        ErrorKind::ExecutionFailure.exit_code(),
        ErrorKind::Unavailable.exit_code(),
    ];
    for (i, a) in codes.iter().enumerate() {
        assert_ne!(*a, 0);
        for b in &codes[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn io_errors_convert() {
    let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.status_code(), 500);
}

// ===========================================================================
// Plan schema
// ===========================================================================

#[test]
fn refactor_plan_with_gate_validates() {
    let payload = json!({
        "title": "refactor auth",
        "graph": {
            "nodes": [
                {"id": "analyze", "task_type": "research", "params": {"goal": "find targets"}},
                {"id": "edit", "task_type": "coding", "approval_gate": {"required_approvers": ["lead"]}},
                {"id": "test", "task_type": "verification",
                 "invariants": [{"id": "tests", "check_type": "test-pass"}]}
            ],
            "edges": [
                {"from": "analyze", "to": "edit"},
                {"from": "edit", "to": "test", "condition": "approved"}
            ]
        }
    });
    let graph = plan::validate(&payload).unwrap().expect("graph");
    assert_eq!(graph.nodes.len(), 3);
    let gates = plan::declared_gates(&graph);
    assert_eq!(gates.len(), 1);
    assert_eq!(gates[0].node_id, "edit");
}

#[test]
fn graph_without_nodes_key_is_invalid() {
    let err = plan::validate(&json!({"graph": {"edges": []}})).unwrap_err();
    assert_eq!(err.code(), "invalid_plan");
}

// ===========================================================================
// Config
// ===========================================================================

#[test]
fn missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AxialConfig::load(&dir.path().join("nope.toml")).unwrap();
    assert_eq!(config.daemon_url, config::DEFAULT_DAEMON_URL);
}

#[test]
fn malformed_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("axial.toml");
    std::fs::write(&path, "daemon_url = [not toml").unwrap();
    let err = AxialConfig::load(&path).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn config_roundtrips_through_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("axial.toml");
    let mut config = AxialConfig::default();
    config.daemon.port = 9191;
    config.router.chain = vec!["claude".into(), "ollama".into()];
    std::fs::write(&path, config.to_toml()).unwrap();

    let loaded = AxialConfig::load(&path).unwrap();
    assert_eq!(loaded.daemon.port, 9191);
    assert_eq!(loaded.router.chain, vec!["claude", "ollama"]);
}

#[test]
fn explicit_config_path_wins() {
    let path = std::path::Path::new("/etc/axial/custom.toml");
    assert_eq!(AxialConfig::resolve_path(Some(path)), path);
}
