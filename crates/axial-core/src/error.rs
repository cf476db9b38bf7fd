//! Error types for Axial

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("gate not found: {0}")]
    GateNotFound(String),

    #[error("gate already resolved: {gate_id} is {status}")]
    GateAlreadyResolved { gate_id: String, status: String },

    #[error("duplicate gate id: {0}")]
    DuplicateGateId(String),

    #[error("invalid gate id: {0}")]
    InvalidGateId(String),

    #[error("task is empty")]
    EmptyTask,

    #[error("unknown routing strategy: {0}")]
    UnknownStrategy(String),

    #[error("routing failed: {0}")]
    RoutingFailed(String),

    #[error("fork already exists: {0}")]
    DuplicateForkId(String),

    #[error("invalid fork id: {0}")]
    InvalidForkId(String),

    #[error("fork not found: {0}")]
    ForkNotFound(String),

    #[error("fork failed: {id} - {message}")]
    ForkFailed { id: String, message: String },

    #[error("ledger entry not found: {0}")]
    EntryNotFound(u64),

    #[error("ledger corrupt: {0}")]
    LedgerCorrupt(String),

    #[error("daemon unavailable: {0}")]
    Unavailable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification surfaced to users: what went wrong, not where.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request itself was invalid.
    InvalidRequest,
    /// The request conflicts with current state.
    StateConflict,
    /// An executor or backend failed while carrying out the request.
    ExecutionFailure,
    /// The daemon could not be reached.
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::StateConflict => "state_conflict",
            ErrorKind::ExecutionFailure => "execution_failure",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        }
    }

    /// Process exit code used by the CLI for this kind of failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::InvalidRequest => 2,
            ErrorKind::StateConflict => 3,
            ErrorKind::ExecutionFailure => 4,
            ErrorKind::Unavailable => 5,
            ErrorKind::Internal => 1,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn invalid_plan(reason: impl Into<String>) -> Self {
        Self::InvalidPlan(reason.into())
    }

    pub fn routing_failed(message: impl Into<String>) -> Self {
        Self::RoutingFailed(message.into())
    }

    pub fn already_resolved(gate_id: impl Into<String>, status: impl std::fmt::Display) -> Self {
        Self::GateAlreadyResolved {
            gate_id: gate_id.into(),
            status: status.to_string(),
        }
    }

    pub fn fork_failed(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ForkFailed {
            id: id.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidPlan(_)
            | Error::EmptyTask
            | Error::DuplicateForkId(_)
            | Error::DuplicateGateId(_)
            | Error::InvalidGateId(_)
            | Error::InvalidForkId(_)
            | Error::UnknownStrategy(_)
            | Error::BadRequest(_) => ErrorKind::InvalidRequest,
            Error::GateNotFound(_)
            | Error::GateAlreadyResolved { .. }
            | Error::ForkNotFound(_)
            | Error::EntryNotFound(_) => ErrorKind::StateConflict,
            Error::RoutingFailed(_) | Error::ForkFailed { .. } => ErrorKind::ExecutionFailure,
            Error::Unavailable(_) => ErrorKind::Unavailable,
            Error::LedgerCorrupt(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable snake_case identifier carried in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidPlan(_) => "invalid_plan",
            Error::GateNotFound(_) => "gate_not_found",
            Error::GateAlreadyResolved { .. } => "gate_already_resolved",
            Error::DuplicateGateId(_) => "duplicate_gate_id",
            Error::InvalidGateId(_) => "invalid_gate_id",
            Error::EmptyTask => "empty_task",
            Error::UnknownStrategy(_) => "unknown_strategy",
            Error::RoutingFailed(_) => "routing_failed",
            Error::DuplicateForkId(_) => "duplicate_fork_id",
            Error::InvalidForkId(_) => "invalid_fork_id",
            Error::ForkNotFound(_) => "fork_not_found",
            Error::ForkFailed { .. } => "fork_failed",
            Error::EntryNotFound(_) => "entry_not_found",
            Error::LedgerCorrupt(_) => "ledger_corrupt",
            Error::Unavailable(_) => "unavailable",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::BadRequest(_) => "bad_request",
            Error::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidPlan(_)
            | Error::EmptyTask
            | Error::InvalidGateId(_)
            | Error::InvalidForkId(_)
            | Error::UnknownStrategy(_)
            | Error::BadRequest(_) => 400,
            Error::GateNotFound(_) | Error::ForkNotFound(_) | Error::EntryNotFound(_) => 404,
            Error::GateAlreadyResolved { .. }
            | Error::DuplicateGateId(_)
            | Error::DuplicateForkId(_) => 409,
            Error::RoutingFailed(_) | Error::ForkFailed { .. } => 502,
            Error::Unavailable(_) => 503,
            _ => 500,
        }
    }

    /// Rebuild an error from the `code` and `error` fields of an HTTP error body.
    ///
    /// `message` is the server's `Display` text; the variant prefix is stripped
    /// before rebuilding so the round-tripped error renders identically.
    pub fn from_wire(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "invalid_plan" => Error::InvalidPlan(strip(&message, "invalid plan: ")),
            "gate_not_found" => Error::GateNotFound(strip(&message, "gate not found: ")),
            "gate_already_resolved" => {
                let rest = strip(&message, "gate already resolved: ");
                match rest.rsplit_once(" is ") {
                    Some((gate_id, status)) => Error::already_resolved(gate_id, status),
                    None => Error::already_resolved(rest, "resolved"),
                }
            }
            "duplicate_gate_id" => Error::DuplicateGateId(strip(&message, "duplicate gate id: ")),
            "invalid_gate_id" => Error::InvalidGateId(strip(&message, "invalid gate id: ")),
            "empty_task" => Error::EmptyTask,
            "unknown_strategy" => {
                Error::UnknownStrategy(strip(&message, "unknown routing strategy: "))
            }
            "routing_failed" => Error::RoutingFailed(strip(&message, "routing failed: ")),
            "duplicate_fork_id" => Error::DuplicateForkId(strip(&message, "fork already exists: ")),
            "invalid_fork_id" => Error::InvalidForkId(strip(&message, "invalid fork id: ")),
            "fork_not_found" => Error::ForkNotFound(strip(&message, "fork not found: ")),
            "fork_failed" => {
                let rest = strip(&message, "fork failed: ");
                match rest.split_once(" - ") {
                    Some((id, msg)) => Error::fork_failed(id, msg),
                    None => Error::fork_failed("", rest),
                }
            }
            "unavailable" => Error::Unavailable(strip(&message, "daemon unavailable: ")),
            "config" => Error::Config(strip(&message, "config error: ")),
            "ledger_corrupt" => Error::LedgerCorrupt(strip(&message, "ledger corrupt: ")),
            "bad_request" => Error::BadRequest(strip(&message, "bad request: ")),
            _ => Error::Internal(message),
        }
    }
}

fn strip(message: &str, prefix: &str) -> String {
    message.strip_prefix(prefix).unwrap_or(message).to_string()
}
