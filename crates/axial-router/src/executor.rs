//! Executor trait and registry
//!
//! Each executor is a standalone unit registered with an ExecutorRegistry.
//! To add an executor kind: create a file in executors/, implement this
//! trait, and wire it into executors::build().

use crate::policy::Candidate;
use axial_core::PrivacyLevel;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("failed to spawn: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("not registered")]
    NotRegistered,

    #[error("at capacity ({0} in flight)")]
    Busy(usize),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

/// A place tasks can run.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Unique executor name (e.g. "ollama", "claude", "echo").
    fn name(&self) -> &str;

    /// Capability keywords matched against task text by the capability policy.
    fn capabilities(&self) -> &[String] { &[] }

    /// Whether task text leaves the machine.
    fn privacy(&self) -> PrivacyLevel { PrivacyLevel::Local }

    /// Run the task and return the executor's raw output.
    async fn execute(&self, task: &str) -> ExecutorResult<String>;

    /// Execute with cancellation support. Default: race execute() against cancellation.
    /// Dropping the execute() future must release the executor's resources
    /// (child processes are spawned with kill_on_drop, HTTP requests abort on drop).
    async fn execute_cancellable(
        &self,
        task: &str,
        cancel: CancellationToken,
    ) -> ExecutorResult<String> {
        tokio::select! {
            result = self.execute(task) => result,
            _ = cancel.cancelled() => Err(ExecutorError::Cancelled),
        }
    }
}

/// A registered executor plus its availability bookkeeping.
pub struct ExecutorSlot {
    executor: Arc<dyn Executor>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ExecutorSlot {
    pub fn executor(&self) -> &Arc<dyn Executor> { &self.executor }

    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    pub fn is_available(&self) -> bool { self.permits.available_permits() > 0 }

    /// Claim a concurrency slot without waiting.
    pub fn try_claim(&self) -> ExecutorResult<tokio::sync::OwnedSemaphorePermit> {
        self.permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| ExecutorError::Busy(self.in_flight()))
    }
}

/// Executors in registration order; order breaks policy ties.
#[derive(Default)]
pub struct ExecutorRegistry {
    slots: Vec<ExecutorSlot>,
}

impl ExecutorRegistry {
    pub fn new() -> Self { Self::default() }

    /// Register an executor. Replaces any existing executor with the same name.
    pub fn register(&mut self, executor: impl Executor + 'static, max_concurrent: usize) {
        self.register_arc(Arc::new(executor), max_concurrent);
    }

    pub fn register_arc(&mut self, executor: Arc<dyn Executor>, max_concurrent: usize) {
        let max_concurrent = max_concurrent.max(1);
        let slot = ExecutorSlot {
            executor,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        };
        match self.slots.iter().position(|s| s.executor.name() == slot.executor.name()) {
            Some(pos) => self.slots[pos] = slot,
            None => self.slots.push(slot),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ExecutorSlot> {
        self.slots.iter().find(|s| s.executor.name() == name)
    }

    pub fn list(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.executor.name()).collect()
    }

    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    /// Snapshot handed to routing policies.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.slots
            .iter()
            .enumerate()
            .map(|(order, slot)| Candidate {
                name: slot.executor.name().to_string(),
                capabilities: slot.executor.capabilities().to_vec(),
                privacy: slot.executor.privacy(),
                available: slot.is_available(),
                in_flight: slot.in_flight(),
                order,
            })
            .collect()
    }
}
