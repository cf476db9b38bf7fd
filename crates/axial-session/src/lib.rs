//! Axial Session - isolated named forks
//!
//! A fork id is reserved in the registry (status `creating`) before the
//! backend does any work, so racing forks of one id have a single winner.
//! The reservation is released if the backend fails or the fork future is
//! dropped. Closing works the same way in reverse: the fork is marked
//! `closing` while the backend tears it down and only leaves the registry
//! once teardown succeeds. No registry lock is held across a backend call.

pub mod backend;
pub mod git;

pub use backend::{ForkBackend, ForkContext, ForkHandle, MemoryBackend};
pub use git::GitWorktreeBackend;

use axial_core::config::{AxialConfig, ForkBackendKind};
use axial_core::{Error, ForkSession, ForkStatus, Result};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

struct ForkEntry {
    session: ForkSession,
    handle: Option<ForkHandle>,
}

pub struct SessionManager {
    forks: Arc<DashMap<String, ForkEntry>>,
    backend: Arc<dyn ForkBackend>,
}

/// Releases a `creating` reservation unless the fork completed.
struct Reservation {
    forks: Arc<DashMap<String, ForkEntry>>,
    id: String,
    armed: bool,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed {
            self.forks
                .remove_if(&self.id, |_, entry| entry.session.status == ForkStatus::Creating);
        }
    }
}

/// Returns a `closing` fork to `active` unless teardown completed.
struct Teardown {
    forks: Arc<DashMap<String, ForkEntry>>,
    id: String,
    armed: bool,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if self.armed {
            if let Some(mut entry) = self.forks.get_mut(&self.id) {
                if entry.session.status == ForkStatus::Closing {
                    entry.session.status = ForkStatus::Active;
                }
            }
        }
    }
}

impl SessionManager {
    pub fn new(backend: Arc<dyn ForkBackend>) -> Self {
        Self {
            forks: Arc::new(DashMap::new()),
            backend,
        }
    }

    /// Memory backend with an empty base state.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::default()))
    }

    pub fn from_config(config: &AxialConfig) -> Self {
        let backend: Arc<dyn ForkBackend> = match config.forks.backend {
            ForkBackendKind::Memory => Arc::new(MemoryBackend::default()),
            ForkBackendKind::GitWorktree => Arc::new(GitWorktreeBackend::new(
                config.forks.repo.clone(),
                config.forks_root(),
                config.forks.branch_prefix.clone(),
            )),
        };
        info!("Fork backend: {}", backend.name());
        Self::new(backend)
    }

    pub fn backend_name(&self) -> &str { self.backend.name() }

    pub async fn fork(&self, id: &str) -> Result<ForkSession> {
        validate_fork_id(id)?;

        let session = ForkSession {
            id: id.to_string(),
            backend: self.backend.name().to_string(),
            location: None,
            status: ForkStatus::Creating,
            created_at: Utc::now(),
        };
        match self.forks.entry(id.to_string()) {
            Entry::Occupied(_) => return Err(Error::DuplicateForkId(id.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(ForkEntry { session, handle: None });
            }
        }
        let mut reservation = Reservation {
            forks: self.forks.clone(),
            id: id.to_string(),
            armed: true,
        };

        let handle = match self.backend.create(id).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Fork {} failed, releasing id: {}", id, e);
                return Err(e);
            }
        };

        let mut entry = self
            .forks
            .get_mut(id)
            .ok_or_else(|| Error::Internal(format!("reservation for fork {} vanished", id)))?;
        entry.session.status = ForkStatus::Active;
        entry.session.location = handle.location.clone();
        entry.handle = Some(handle);
        reservation.armed = false;

        info!("Fork {} active ({})", id, entry.session.backend);
        Ok(entry.session.clone())
    }

    pub fn get(&self, id: &str) -> Result<ForkSession> {
        self.forks
            .get(id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| Error::ForkNotFound(id.to_string()))
    }

    /// All forks, oldest first.
    pub fn list(&self) -> Vec<ForkSession> {
        let mut forks: Vec<ForkSession> = self.forks.iter().map(|e| e.session.clone()).collect();
        forks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        forks
    }

    pub fn len(&self) -> usize { self.forks.len() }

    pub fn is_empty(&self) -> bool { self.forks.is_empty() }

    /// Key/value state of an active fork. `None` for backends without one (git).
    pub fn context(&self, id: &str) -> Result<Option<Arc<ForkContext>>> {
        let entry = self
            .forks
            .get(id)
            .filter(|e| e.session.status == ForkStatus::Active)
            .ok_or_else(|| Error::ForkNotFound(id.to_string()))?;
        Ok(entry.handle.as_ref().and_then(|h| h.context.clone()))
    }

    /// Discard an active fork and free its id. Nothing is merged back.
    ///
    /// If the backend cannot tear the fork down it stays active and the
    /// close can be retried.
    pub async fn close(&self, id: &str) -> Result<ForkSession> {
        let handle = {
            let mut entry = self
                .forks
                .get_mut(id)
                .filter(|e| e.session.status == ForkStatus::Active)
                .ok_or_else(|| Error::ForkNotFound(id.to_string()))?;
            entry.session.status = ForkStatus::Closing;
            entry.handle.clone().unwrap_or_default()
        };
        let mut teardown = Teardown {
            forks: self.forks.clone(),
            id: id.to_string(),
            armed: true,
        };

        if let Err(e) = self.backend.remove(id, &handle).await {
            warn!("Fork {} teardown failed, keeping it active: {}", id, e);
            return Err(e);
        }

        teardown.armed = false;
        let (_, entry) = self
            .forks
            .remove_if(id, |_, e| e.session.status == ForkStatus::Closing)
            .ok_or_else(|| Error::Internal(format!("fork {} vanished while closing", id)))?;

        info!("Fork {} closed", id);
        Ok(entry.session)
    }
}

/// Ids are path- and branch-safe: `[A-Za-z0-9._/-]`, no empty, `.` or `..` segments.
pub fn validate_fork_id(id: &str) -> Result<()> {
    let invalid = || Error::InvalidForkId(id.to_string());
    if id.is_empty() {
        return Err(invalid());
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-'))
    {
        return Err(invalid());
    }
    if id.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_id_rules() {
        for ok in ["feature-x", "a.b_c", "user/topic", "v1.2"] {
            assert!(validate_fork_id(ok).is_ok(), "{ok}");
        }
        for bad in ["", "a b", "semi;colon", "../escape", "/abs", "trailing/", "a//b", "ü"] {
            assert!(matches!(validate_fork_id(bad), Err(Error::InvalidForkId(_))), "{bad}");
        }
    }
}
