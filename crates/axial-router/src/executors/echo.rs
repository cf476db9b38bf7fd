//! Echo executor — returns the task text unchanged

use crate::executor::{Executor, ExecutorResult};

pub struct EchoExecutor {
    name: String,
    capabilities: Vec<String>,
}

impl EchoExecutor {
    pub fn new() -> Self { Self::named("echo") }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), capabilities: vec!["echo".to_string()] }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl Default for EchoExecutor {
    fn default() -> Self { Self::new() }
}

#[async_trait::async_trait]
impl Executor for EchoExecutor {
    fn name(&self) -> &str { &self.name }

    fn capabilities(&self) -> &[String] { &self.capabilities }

    async fn execute(&self, task: &str) -> ExecutorResult<String> {
        Ok(task.to_string())
    }
}
