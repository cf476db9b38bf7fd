//! Fork backends — the isolation substrate behind each fork

use axial_core::Result;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Key/value working state owned by one fork.
#[derive(Debug, Default)]
pub struct ForkContext {
    values: DashMap<String, Value>,
}

impl ForkContext {
    pub fn new() -> Self { Self::default() }

    pub fn from_snapshot(snapshot: BTreeMap<String, Value>) -> Self {
        Self { values: snapshot.into_iter().collect() }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.remove(key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Point-in-time copy, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}

/// What a backend hands back for a newly created fork.
#[derive(Clone, Debug, Default)]
pub struct ForkHandle {
    pub location: Option<PathBuf>,
    pub context: Option<Arc<ForkContext>>,
}

#[async_trait::async_trait]
pub trait ForkBackend: Send + Sync {
    /// Backend name reported on each ForkSession ("memory", "git-worktree").
    fn name(&self) -> &str;

    /// Set up an isolated context for `id`. The id is already reserved and validated.
    async fn create(&self, id: &str) -> Result<ForkHandle>;

    /// Tear down a fork's context.
    async fn remove(&self, id: &str, handle: &ForkHandle) -> Result<()>;
}

/// Each fork gets a private ForkContext seeded from a snapshot of the base.
pub struct MemoryBackend {
    base: Arc<ForkContext>,
}

impl MemoryBackend {
    pub fn new(base: Arc<ForkContext>) -> Self { Self { base } }

    pub fn base(&self) -> &Arc<ForkContext> { &self.base }
}

impl Default for MemoryBackend {
    fn default() -> Self { Self::new(Arc::new(ForkContext::new())) }
}

#[async_trait::async_trait]
impl ForkBackend for MemoryBackend {
    fn name(&self) -> &str { "memory" }

    async fn create(&self, _id: &str) -> Result<ForkHandle> {
        Ok(ForkHandle {
            location: None,
            context: Some(Arc::new(ForkContext::from_snapshot(self.base.snapshot()))),
        })
    }

    async fn remove(&self, _id: &str, _handle: &ForkHandle) -> Result<()> {
        Ok(())
    }
}
