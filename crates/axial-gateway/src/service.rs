//! AxialService — the daemon's component graph
//!
//! Each component sits behind its own Arc; no operation holds more than one
//! component's lock at a time.

use axial_core::config::AxialConfig;
use axial_core::{
    plan, ApprovalRequest, ApprovalResponse, CreateGateRequest, Error, ExportManifest,
    ExportRequest, ForkSession, Gate, HealthResponse, LedgerEntry, PlanResponse, Result,
    RouteOutcome, RouteRequest, VerifyResponse,
};
use axial_gate::{GateRegistry, GateSpec};
use axial_ledger::Ledger;
use axial_router::{CancellationToken, Router};
use axial_session::SessionManager;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct AxialService {
    ledger: Arc<Ledger>,
    gates: Arc<GateRegistry>,
    router: Arc<Router>,
    sessions: Arc<SessionManager>,
}

impl AxialService {
    pub fn new(ledger: Ledger, gates: GateRegistry, router: Router, sessions: SessionManager) -> Self {
        Self {
            ledger: Arc::new(ledger),
            gates: Arc::new(gates),
            router: Arc::new(router),
            sessions: Arc::new(sessions),
        }
    }

    /// Build every component from config. Opens (and verifies) the ledger file when persistence is on.
    pub async fn from_config(config: &AxialConfig) -> Result<Self> {
        let ledger = if config.ledger.persist {
            Ledger::open(config.ledger_path()).await?
        } else {
            info!("Ledger persistence disabled; entries are kept in memory");
            Ledger::in_memory()
        };
        let router = Router::from_config(&config.router)?;
        let sessions = SessionManager::from_config(config);
        Ok(Self::new(ledger, GateRegistry::new(), router, sessions))
    }

    pub fn ledger(&self) -> &Arc<Ledger> { &self.ledger }

    pub fn gates(&self) -> &Arc<GateRegistry> { &self.gates }

    pub fn router(&self) -> &Arc<Router> { &self.router }

    pub fn sessions(&self) -> &Arc<SessionManager> { &self.sessions }

    // ========================================================================
    // Plans and gates
    // ========================================================================

    /// Append a plan, then register the gates its graph declares.
    ///
    /// A declared gate whose id is already taken is logged and skipped; the
    /// plan entry stays.
    pub async fn submit_plan(&self, payload: Value) -> Result<PlanResponse> {
        let entry = self.ledger.submit(payload).await?;

        let mut gates = Vec::new();
        if let Some(graph) = plan::validate(&entry.payload)? {
            for declared in plan::declared_gates(&graph) {
                let gate_id = declared.resolve_id(entry.index);
                let spec = GateSpec::for_plan(entry.index, format!("node {}", declared.node_id));
                match self.gates.create_gate(Some(gate_id.clone()), spec) {
                    Ok(gate) => gates.push(gate.gate_id),
                    Err(e) => warn!("Plan {}: gate {} not registered: {}", entry.index, gate_id, e),
                }
            }
        }

        info!("Plan {} accepted ({} gates)", entry.index, gates.len());
        Ok(PlanResponse {
            ledger_index: entry.index,
            gates,
        })
    }

    pub fn approve(&self, request: &ApprovalRequest) -> Result<ApprovalResponse> {
        let gate = self.gates.resolve(&request.gate_id, request.approved)?;
        Ok(ApprovalResponse::acknowledged(gate))
    }

    pub fn create_gate(&self, request: CreateGateRequest) -> Result<Gate> {
        let spec = GateSpec {
            plan_index: None,
            description: request.description,
        };
        self.gates.create_gate(request.gate_id, spec)
    }

    pub fn list_gates(&self, pending_only: bool) -> Vec<Gate> {
        if pending_only {
            self.gates.pending()
        } else {
            self.gates.list()
        }
    }

    pub fn gate(&self, gate_id: &str) -> Result<Gate> {
        self.gates.get(gate_id)
    }

    /// Block until the gate is decided or `timeout` passes, then return it.
    /// A gate that is still pending comes back with status `pending`.
    pub async fn wait_gate(&self, gate_id: &str, timeout: Duration) -> Result<Gate> {
        self.gates.wait(gate_id, timeout).await?;
        self.gates.get(gate_id)
    }

    // ========================================================================
    // Ledger
    // ========================================================================

    /// Entries oldest first, or search matches newest first.
    pub async fn ledger_entries(&self, query: Option<&str>) -> Vec<LedgerEntry> {
        match query.filter(|q| !q.is_empty()) {
            Some(q) => self.ledger.query(q).await,
            None => self.ledger.entries().await,
        }
    }

    pub async fn ledger_entry(&self, index: u64) -> Result<LedgerEntry> {
        self.ledger.get(index).await
    }

    pub async fn verify_ledger(&self) -> VerifyResponse {
        VerifyResponse {
            valid: self.ledger.verify().await,
            entries: self.ledger.len().await,
            head_hash: self.ledger.head_hash().await,
        }
    }

    /// Export to a directory on the daemon's machine. Relative paths are
    /// refused since they would resolve against the daemon's working directory.
    pub async fn export_ledger(&self, request: &ExportRequest) -> Result<ExportManifest> {
        if !request.out.is_absolute() {
            return Err(Error::BadRequest(format!(
                "export directory must be absolute, got {}",
                request.out.display()
            )));
        }
        self.ledger.export(&request.out).await
    }

    // ========================================================================
    // Routing and forks
    // ========================================================================

    pub async fn route(&self, request: &RouteRequest, cancel: CancellationToken) -> Result<RouteOutcome> {
        self.router
            .route_cancellable(&request.task, request.strategy.as_deref(), cancel)
            .await
    }

    pub async fn fork(&self, id: &str) -> Result<ForkSession> {
        self.sessions.fork(id).await
    }

    pub fn list_forks(&self) -> Vec<ForkSession> {
        self.sessions.list()
    }

    pub fn get_fork(&self, id: &str) -> Result<ForkSession> {
        self.sessions.get(id)
    }

    pub async fn close_fork(&self, id: &str) -> Result<ForkSession> {
        self.sessions.close(id).await
    }

    pub async fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ledger_entries: self.ledger.len().await,
            pending_gates: self.gates.pending_count(),
            forks: self.sessions.len(),
            executors: self.router.executor_names(),
        }
    }
}
