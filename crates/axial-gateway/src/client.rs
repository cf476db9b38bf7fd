//! DaemonClient — typed HTTP client for a running axial daemon
//!
//! Transport failures become `Error::Unavailable`; error bodies are turned
//! back into the variant the daemon raised.

use axial_core::{
    ApprovalRequest, ApprovalResponse, CreateGateRequest, Error, ErrorBody, ExportManifest,
    ExportRequest, ForkRequest, ForkSession, Gate, HealthResponse, LedgerEntry, PlanResponse,
    Result, RouteOutcome, RouteRequest, VerifyResponse,
};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub struct DaemonClient {
    base_url: String,
    http: reqwest::Client,
}

impl DaemonClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    /// `base_url` plus one percent-encoded path segment per element.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid daemon url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("invalid daemon url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.url(segments)?;
        debug!("{} {}", method, url);
        Ok(self.http.request(method, url))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Unavailable(format!("{}: {}", self.base_url, e)))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Unavailable(format!("{}: {}", self.base_url, e)))?;

        if status.is_success() {
            return serde_json::from_slice(&bytes)
                .map_err(|e| Error::Internal(format!("unexpected daemon response: {}", e)));
        }
        match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(body) => Err(body.into_error()),
            Err(_) => Err(Error::Internal(format!(
                "daemon returned {}: {}",
                status,
                String::from_utf8_lossy(&bytes)
            ))),
        }
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        self.send(self.request(Method::GET, segments)?).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, segments: &[&str], body: &B) -> Result<T> {
        self.send(self.request(Method::POST, segments)?.json(body)).await
    }

    // ========================================================================
    // Endpoints
    // ========================================================================

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get(&["health"]).await
    }

    pub async fn submit_plan(&self, payload: &serde_json::Value) -> Result<PlanResponse> {
        self.post(&["plan"], payload).await
    }

    pub async fn approve(&self, gate_id: &str, approved: bool) -> Result<ApprovalResponse> {
        let request = ApprovalRequest {
            gate_id: gate_id.to_string(),
            approved,
        };
        self.post(&["approve"], &request).await
    }

    pub async fn create_gate(&self, request: &CreateGateRequest) -> Result<Gate> {
        self.post(&["gates"], request).await
    }

    pub async fn gates(&self, pending_only: bool) -> Result<Vec<Gate>> {
        let mut request = self.request(Method::GET, &["gates"])?;
        if pending_only {
            request = request.query(&[("pending", "true")]);
        }
        self.send(request).await
    }

    pub async fn gate(&self, gate_id: &str) -> Result<Gate> {
        self.get(&["gates", gate_id]).await
    }

    /// Wait up to `timeout_secs` (capped by the daemon) for a decision.
    pub async fn wait_gate(&self, gate_id: &str, timeout_secs: u64) -> Result<Gate> {
        let request = self
            .request(Method::GET, &["gates", gate_id, "wait"])?
            .query(&[("timeout_secs", timeout_secs)]);
        self.send(request).await
    }

    pub async fn ledger(&self, query: Option<&str>) -> Result<Vec<LedgerEntry>> {
        let mut request = self.request(Method::GET, &["ledger"])?;
        if let Some(q) = query {
            request = request.query(&[("q", q)]);
        }
        self.send(request).await
    }

    pub async fn ledger_entry(&self, index: u64) -> Result<LedgerEntry> {
        self.get(&["ledger", &index.to_string()]).await
    }

    pub async fn verify_ledger(&self) -> Result<VerifyResponse> {
        self.get(&["ledger", "verify"]).await
    }

    pub async fn export_ledger(&self, out: &Path) -> Result<ExportManifest> {
        self.post(&["ledger", "export"], &ExportRequest { out: out.to_path_buf() }).await
    }

    pub async fn route(&self, task: &str, strategy: Option<&str>) -> Result<RouteOutcome> {
        let request = RouteRequest {
            task: task.to_string(),
            strategy: strategy.map(String::from),
        };
        self.post(&["route"], &request).await
    }

    pub async fn fork(&self, id: &str) -> Result<ForkSession> {
        self.post(&["fork"], &ForkRequest { id: id.to_string() }).await
    }

    pub async fn forks(&self) -> Result<Vec<ForkSession>> {
        self.get(&["forks"]).await
    }

    pub async fn close_fork(&self, id: &str) -> Result<ForkSession> {
        self.send(self.request(Method::DELETE, &["forks", id])?).await
    }
}
