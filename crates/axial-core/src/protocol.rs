//! HTTP wire bodies shared by the daemon and its clients
//!
//! Request bodies:
//!   POST /plan     <any JSON object>
//!   POST /approve  { "gate_id": "g1", "approved": true }
//!   POST /gates    { "gate_id": "g1", "description": "deploy" }
//!   POST /route    { "task": "refactor auth", "strategy": "capability" }
//!   POST /fork     { "id": "debug-auth-bug" }
//!   POST /ledger/export  { "out": "/abs/dir" }
//!
//! Error body (every non-2xx response):
//!   { "error": "gate already resolved: g1 is approved", "code": "gate_already_resolved", "kind": "state_conflict" }

use crate::error::{Error, ErrorKind};
use crate::types::Gate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub ledger_index: u64,
    #[serde(default)]
    pub gates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub gate_id: String,
    pub approved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub status: String,
    pub gate: Gate,
}

impl ApprovalResponse {
    pub fn acknowledged(gate: Gate) -> Self {
        Self {
            status: "acknowledged".to_string(),
            gate,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateGateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub entries: usize,
    pub head_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Absolute directory the export is written to; created if missing.
    pub out: PathBuf,
}

/// `manifest.json` of a ledger export, written next to the copied `ledger.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportManifest {
    pub exported_at: DateTime<Utc>,
    pub entries: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_index: Option<u64>,
    /// Hash of the newest exported entry.
    pub root_hash: String,
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ledger_entries: usize,
    pub pending_gates: usize,
    pub forks: usize,
    pub executors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub kind: ErrorKind,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            error: err.to_string(),
            code: err.code().to_string(),
            kind: err.kind(),
        }
    }
}

impl ErrorBody {
    pub fn into_error(self) -> Error {
        Error::from_wire(&self.code, self.error)
    }
}
