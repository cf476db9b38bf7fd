//! Daemon and CLI configuration
//!
//! Loaded from TOML at startup, every section falls back to defaults.
//! Precedence: CLI flags > environment > config file > defaults.

use crate::error::{Error, Result};
use crate::types::PrivacyLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_DATA_DIR: &str = ".axial";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AxialConfig {
    /// Endpoint clients (editor integrations, the CLI) talk to.
    pub daemon_url: String,
    /// Directory holding the ledger file, forks and the default config.
    pub data_dir: PathBuf,
    pub daemon: DaemonConfig,
    pub ledger: LedgerConfig,
    pub router: RouterConfig,
    pub forks: ForkConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Append entries to `<data_dir>/ledger.jsonl`. Off = in-memory only.
    pub persist: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Policy used when a request names none.
    pub default_strategy: String,
    /// Executor for the `static` policy. Defaults to the first executor.
    pub default_executor: Option<String>,
    /// Upper bound on a single dispatch.
    pub timeout_secs: u64,
    /// Ordered executors for the `chain` policy.
    pub chain: Vec<String>,
    /// Capability weights for the `capability` policy (unlisted = 1.0).
    pub weights: HashMap<String, f64>,
    pub executors: Vec<ExecutorConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Command,
    Ollama,
    Echo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub name: String,
    pub kind: ExecutorKind,
    /// Program for `command` executors.
    #[serde(default)]
    pub program: Option<String>,
    /// Arguments for `command` executors; `{task}` is replaced by the task text.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub privacy: PrivacyLevel,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_max_concurrent() -> usize {
    4
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ForkBackendKind {
    #[default]
    Memory,
    GitWorktree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkConfig {
    pub backend: ForkBackendKind,
    /// Repository the git backend adds worktrees to.
    pub repo: PathBuf,
    /// Directory worktrees are created under. Defaults to `<data_dir>/forks`.
    pub root: Option<PathBuf>,
    pub branch_prefix: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Command line spawned by `axial ui`, e.g. `["npm", "run", "tauri", "dev"]`.
    pub command: Vec<String>,
}

// ============================================================
// Defaults
// ============================================================

impl Default for AxialConfig {
    fn default() -> Self {
        Self {
            daemon_url: DEFAULT_DAEMON_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            daemon: DaemonConfig::default(),
            ledger: LedgerConfig::default(),
            router: RouterConfig::default(),
            forks: ForkConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { persist: true }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert("code-editing".to_string(), 1.5);
        weights.insert("reasoning".to_string(), 2.0);
        Self {
            default_strategy: "capability".to_string(),
            default_executor: None,
            timeout_secs: 120,
            chain: Vec::new(),
            weights,
            executors: Vec::new(),
        }
    }
}

impl Default for ForkConfig {
    fn default() -> Self {
        Self {
            backend: ForkBackendKind::Memory,
            repo: PathBuf::from("."),
            root: None,
            branch_prefix: "axial/".to_string(),
        }
    }
}

impl RouterConfig {
    /// Configured executors, or the built-in pair when none are configured.
    pub fn effective_executors(&self) -> Vec<ExecutorConfig> {
        if !self.executors.is_empty() {
            return self.executors.clone();
        }
        vec![
            ExecutorConfig {
                name: "ollama".to_string(),
                kind: ExecutorKind::Ollama,
                program: None,
                args: Vec::new(),
                base_url: Some("http://localhost:11434".to_string()),
                model: Some("llama3".to_string()),
                capabilities: vec![
                    "text-generation".to_string(),
                    "code-editing".to_string(),
                    "reasoning".to_string(),
                ],
                privacy: PrivacyLevel::Local,
                max_concurrent: default_max_concurrent(),
            },
            ExecutorConfig {
                name: "echo".to_string(),
                kind: ExecutorKind::Echo,
                program: None,
                args: Vec::new(),
                base_url: None,
                model: None,
                capabilities: vec!["echo".to_string()],
                privacy: PrivacyLevel::Local,
                max_concurrent: default_max_concurrent(),
            },
        ]
    }
}

impl AxialConfig {
    /// Load from a TOML file. A missing file yields defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: Self = toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                tracing::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!("{}: {}", path.display(), e))),
        }
    }

    /// Pick the config file: explicit path, then `AXIAL_CONFIG`, then `<data_dir>/axial.toml`.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var("AXIAL_CONFIG") {
            return PathBuf::from(path);
        }
        let data_dir = std::env::var("AXIAL_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        PathBuf::from(data_dir).join("axial.toml")
    }

    /// Apply `AXIAL_DAEMON_URL` and `AXIAL_DATA_DIR` overrides.
    pub fn apply_env(mut self) -> Self {
        self.apply_overrides(
            std::env::var("AXIAL_DAEMON_URL").ok(),
            std::env::var("AXIAL_DATA_DIR").ok(),
        );
        self
    }

    fn apply_overrides(&mut self, daemon_url: Option<String>, data_dir: Option<String>) {
        if let Some(url) = daemon_url.filter(|u| !u.trim().is_empty()) {
            self.daemon_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = data_dir.filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.jsonl")
    }

    pub fn forks_root(&self) -> PathBuf {
        self.forks
            .root
            .clone()
            .unwrap_or_else(|| self.data_dir.join("forks"))
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
