//! Ollama executor — local model over the Ollama HTTP API

use crate::executor::{Executor, ExecutorError, ExecutorResult};
use axial_core::PrivacyLevel;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct OllamaExecutor {
    name: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
    capabilities: Vec<String>,
    privacy: PrivacyLevel,
}

impl OllamaExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            capabilities: Vec::new(),
            privacy: PrivacyLevel::Local,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_privacy(mut self, privacy: PrivacyLevel) -> Self {
        self.privacy = privacy;
        self
    }
}

#[async_trait::async_trait]
impl Executor for OllamaExecutor {
    fn name(&self) -> &str { &self.name }

    fn capabilities(&self) -> &[String] { &self.capabilities }

    fn privacy(&self) -> PrivacyLevel { self.privacy }

    async fn execute(&self, task: &str) -> ExecutorResult<String> {
        let url = format!("{}/api/generate", self.base_url);
        debug!("POST {} (model {})", url, self.model);

        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest { model: &self.model, prompt: task, stream: false })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Failed(format!("ollama returned {}: {}", status, body)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ExecutorError::InvalidResponse(e.to_string()))?;
        match (body.response, body.error) {
            (_, Some(error)) => Err(ExecutorError::Failed(error)),
            (Some(text), None) => Ok(text),
            (None, None) => Err(ExecutorError::InvalidResponse("missing `response` field".into())),
        }
    }
}
