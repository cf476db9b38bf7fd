//! Axial Gate - human-in-the-loop approval gates
//!
//! Each gate resolves exactly once. Resolution takes the gate's entry lock,
//! checks the status and writes the decision in one step, so concurrent
//! resolvers of the same gate see exactly one winner. Waiters subscribe to a
//! per-gate watch channel and never hold the registry lock while suspended.

use axial_core::{Error, Gate, GateStatus, Result};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Optional metadata attached to a new gate.
#[derive(Clone, Debug, Default)]
pub struct GateSpec {
    pub plan_index: Option<u64>,
    pub description: Option<String>,
}

impl GateSpec {
    pub fn for_plan(plan_index: u64, description: impl Into<String>) -> Self {
        Self {
            plan_index: Some(plan_index),
            description: Some(description.into()),
        }
    }
}

struct GateSlot {
    gate: Gate,
    status_tx: watch::Sender<GateStatus>,
}

pub struct GateRegistry {
    gates: DashMap<String, GateSlot>,
}

impl Default for GateRegistry {
    fn default() -> Self { Self::new() }
}

impl GateRegistry {
    pub fn new() -> Self { Self { gates: DashMap::new() } }

    /// Register a pending gate. Without a caller-supplied id a UUID is assigned.
    pub fn create_gate(&self, gate_id: Option<String>, spec: GateSpec) -> Result<Gate> {
        let gate_id = match gate_id {
            Some(id) => {
                let id = id.trim().to_string();
                if id.is_empty() {
                    return Err(Error::InvalidGateId(id));
                }
                id
            }
            None => uuid::Uuid::new_v4().to_string(),
        };

        match self.gates.entry(gate_id.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateGateId(gate_id)),
            Entry::Vacant(vacant) => {
                let gate = Gate {
                    gate_id: gate_id.clone(),
                    status: GateStatus::Pending,
                    plan_index: spec.plan_index,
                    description: spec.description,
                    created_at: Utc::now(),
                    resolved_at: None,
                };
                let (status_tx, _) = watch::channel(GateStatus::Pending);
                vacant.insert(GateSlot {
                    gate: gate.clone(),
                    status_tx,
                });
                info!("Gate {} created (plan {:?})", gate_id, gate.plan_index);
                Ok(gate)
            }
        }
    }

    /// Approve or reject a pending gate. Any second resolution fails, even with the same decision.
    pub fn resolve(&self, gate_id: &str, approved: bool) -> Result<Gate> {
        let mut slot = self
            .gates
            .get_mut(gate_id)
            .ok_or_else(|| Error::GateNotFound(gate_id.to_string()))?;

        if slot.gate.status.is_resolved() {
            debug!("Gate {} already {}", gate_id, slot.gate.status);
            return Err(Error::already_resolved(gate_id, slot.gate.status));
        }

        let status = GateStatus::from_decision(approved);
        slot.gate.status = status;
        slot.gate.resolved_at = Some(Utc::now());
        slot.status_tx.send_replace(status);
        info!("Gate {} {}", gate_id, status);
        Ok(slot.gate.clone())
    }

    pub fn get(&self, gate_id: &str) -> Result<Gate> {
        self.gates
            .get(gate_id)
            .map(|slot| slot.gate.clone())
            .ok_or_else(|| Error::GateNotFound(gate_id.to_string()))
    }

    /// All gates, oldest first.
    pub fn list(&self) -> Vec<Gate> {
        let mut gates: Vec<Gate> = self.gates.iter().map(|slot| slot.gate.clone()).collect();
        gates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.gate_id.cmp(&b.gate_id)));
        gates
    }

    pub fn pending(&self) -> Vec<Gate> {
        self.list()
            .into_iter()
            .filter(|g| g.status == GateStatus::Pending)
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.gates
            .iter()
            .filter(|slot| slot.gate.status == GateStatus::Pending)
            .count()
    }

    /// Suspend until the gate is resolved or `timeout` elapses.
    ///
    /// Returns `Pending` on timeout; side-effecting work must only proceed on `Approved`.
    pub async fn wait(&self, gate_id: &str, timeout: Duration) -> Result<GateStatus> {
        let mut rx = {
            let slot = self
                .gates
                .get(gate_id)
                .ok_or_else(|| Error::GateNotFound(gate_id.to_string()))?;
            slot.status_tx.subscribe()
        };

        let result = tokio::time::timeout(timeout, rx.wait_for(|s| s.is_resolved())).await;
        match result {
            Ok(Ok(status)) => Ok(*status),
            Ok(Err(_)) => Err(Error::GateNotFound(gate_id.to_string())),
            Err(_) => Ok(GateStatus::Pending),
        }
    }
}
