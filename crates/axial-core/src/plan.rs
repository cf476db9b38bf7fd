//! Plan payload schema and validation
//!
//! A plan is any non-empty JSON object. Plans that carry a `graph` key are
//! checked structurally: node ids unique, edges pointing at known nodes.
//! Nodes may declare approval gates, which the daemon registers once the
//! plan is on the ledger.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskGraph {
    pub nodes: Vec<TaskNode>,
    #[serde(default)]
    pub edges: Vec<TaskEdge>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: String,
    pub task_type: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub invariants: Vec<Invariant>,
    #[serde(default)]
    pub approval_gate: Option<ApprovalGate>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskEdge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Invariant {
    pub id: String,
    pub check_type: String,
    #[serde(default)]
    pub config: Value,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ApprovalGate {
    #[serde(default)]
    pub gate_id: Option<String>,
    #[serde(default)]
    pub required_approvers: Vec<String>,
    #[serde(default)]
    pub notification_channel: Option<String>,
}

/// A gate requested by a plan node.
#[derive(Clone, Debug, PartialEq)]
pub struct DeclaredGate {
    pub node_id: String,
    pub gate_id: Option<String>,
}

impl DeclaredGate {
    /// Gate id to register: the node's explicit id, or one derived from the ledger index.
    pub fn resolve_id(&self, ledger_index: u64) -> String {
        self.gate_id
            .clone()
            .unwrap_or_else(|| format!("plan-{}-{}", ledger_index, self.node_id))
    }
}

/// Validate a plan payload, returning the parsed graph if it has one.
pub fn validate(payload: &Value) -> Result<Option<TaskGraph>> {
    let object = payload
        .as_object()
        .ok_or_else(|| Error::invalid_plan(format!("expected a JSON object, got {}", type_name(payload))))?;
    if object.is_empty() {
        return Err(Error::invalid_plan("plan payload is empty"));
    }

    let Some(raw_graph) = object.get("graph") else {
        return Ok(None);
    };
    let graph: TaskGraph = serde_json::from_value(raw_graph.clone())
        .map_err(|e| Error::invalid_plan(format!("malformed graph: {}", e)))?;

    let mut ids = HashSet::new();
    for node in &graph.nodes {
        if node.id.trim().is_empty() {
            return Err(Error::invalid_plan("graph node with empty id"));
        }
        if !ids.insert(node.id.as_str()) {
            return Err(Error::invalid_plan(format!("duplicate graph node: {}", node.id)));
        }
    }
    for edge in &graph.edges {
        for end in [&edge.from, &edge.to] {
            if !ids.contains(end.as_str()) {
                return Err(Error::invalid_plan(format!(
                    "edge {} -> {} references unknown node {}",
                    edge.from, edge.to, end
                )));
            }
        }
    }

    Ok(Some(graph))
}

/// Gates declared by the nodes of a validated plan, in node order.
pub fn declared_gates(graph: &TaskGraph) -> Vec<DeclaredGate> {
    graph
        .nodes
        .iter()
        .filter_map(|node| {
            node.approval_gate.as_ref().map(|gate| DeclaredGate {
                node_id: node.id.clone(),
                gate_id: gate.gate_id.clone().filter(|id| !id.trim().is_empty()),
            })
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
