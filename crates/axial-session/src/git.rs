//! Git worktree backend — one branch and working tree per fork

use crate::backend::{ForkBackend, ForkHandle};
use axial_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub struct GitWorktreeBackend {
    repo: PathBuf,
    root: PathBuf,
    branch_prefix: String,
}

impl GitWorktreeBackend {
    pub fn new(repo: impl Into<PathBuf>, root: impl Into<PathBuf>, branch_prefix: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            root: root.into(),
            branch_prefix: branch_prefix.into(),
        }
    }

    pub fn branch_name(&self, id: &str) -> String {
        format!("{}{}", self.branch_prefix, id)
    }

    /// Worktree directory for `id`. Absolute, because git runs with `-C <repo>`.
    pub fn worktree_path(&self, id: &str) -> Result<PathBuf> {
        let root = if self.root.is_absolute() {
            self.root.clone()
        } else {
            std::env::current_dir()?.join(&self.root)
        };
        Ok(root.join(id))
    }

    async fn git(&self, id: &str, args: &[&str]) -> Result<String> {
        debug!("git -C {} {}", self.repo.display(), args.join(" "));
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::fork_failed(id, format!("failed to run git: {}", e)))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(Error::fork_failed(id, String::from_utf8_lossy(&output.stderr).trim().to_string()))
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[async_trait::async_trait]
impl ForkBackend for GitWorktreeBackend {
    fn name(&self) -> &str { "git-worktree" }

    async fn create(&self, id: &str) -> Result<ForkHandle> {
        let path = self.worktree_path(id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let branch = self.branch_name(id);
        self.git(id, &["worktree", "add", "-b", &branch, &path_arg(&path)]).await?;
        info!("Fork {} checked out on {} at {}", id, branch, path.display());
        Ok(ForkHandle {
            location: Some(path),
            context: None,
        })
    }

    async fn remove(&self, id: &str, handle: &ForkHandle) -> Result<()> {
        let path = match &handle.location {
            Some(path) => path.clone(),
            None => self.worktree_path(id)?,
        };
        self.git(id, &["worktree", "remove", "--force", &path_arg(&path)]).await?;

        // The branch goes too, so the id can be forked again.
        let branch = self.branch_name(id);
        if let Err(e) = self.git(id, &["branch", "-D", &branch]).await {
            warn!("Worktree for {} removed but branch {} remains: {}", id, branch, e);
        }
        Ok(())
    }
}
