//! Core types for Axial

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One record of the append-only plan ledger.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub index: u64,
    pub payload: serde_json::Value,
    pub submitted_at: DateTime<Utc>,
    pub previous_hash: String,
    pub hash: String,
}

/// Approval gate status
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Pending,
    Approved,
    Rejected,
}

impl GateStatus {
    pub fn from_decision(approved: bool) -> Self {
        if approved {
            GateStatus::Approved
        } else {
            GateStatus::Rejected
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, GateStatus::Pending)
    }
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateStatus::Pending => write!(f, "pending"),
            GateStatus::Approved => write!(f, "approved"),
            GateStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A human-approval checkpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Gate {
    pub gate_id: String,
    pub status: GateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Lifecycle of a fork session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ForkStatus {
    /// Id reserved, backend still setting up the context.
    Creating,
    Active,
    /// Backend teardown in progress; the id stays taken until it finishes.
    Closing,
}

/// An isolated named working context.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ForkSession {
    pub id: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,
    pub status: ForkStatus,
    pub created_at: DateTime<Utc>,
}

/// Where an executor sends the task text.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    #[default]
    Local,
    Cloud,
}

/// Which executor a policy picked, before dispatch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RouteDecision {
    pub executor: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<String>,
    pub strategy: String,
    pub explanation: String,
}

/// Result of a dispatched route.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RouteOutcome {
    pub executor: String,
    pub output: String,
    pub strategy: String,
    pub explanation: String,
    pub elapsed_ms: u64,
}
