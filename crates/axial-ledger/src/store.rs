//! Ledger store with optional JSONL persistence
//!
//! All writers funnel through one async mutex, so index assignment, hash
//! linking and the file append happen in a single critical section and the
//! file order always matches index order.

use crate::chain::{compute_hash, genesis_hash, verify_chain};
use axial_core::{plan, Error, ExportManifest, LedgerEntry, Result};
use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Index handed to the first plan of an empty ledger.
pub const FIRST_INDEX: u64 = 1;

/// File names inside an export directory.
pub const EXPORT_LEDGER_FILE: &str = "ledger.jsonl";
pub const EXPORT_MANIFEST_FILE: &str = "manifest.json";

pub struct Ledger {
    state: Mutex<LedgerState>,
    path: Option<PathBuf>,
}

struct LedgerState {
    entries: Vec<LedgerEntry>,
    next_index: u64,
    last_hash: String,
    file: Option<File>,
}

impl Ledger {
    /// A ledger that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                entries: Vec::new(),
                next_index: FIRST_INDEX,
                last_hash: genesis_hash(),
                file: None,
            }),
            path: None,
        }
    }

    /// Open (or create) a JSONL-backed ledger, replaying existing entries.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let complete = drop_torn_tail(&path, &content).await?;
                parse_jsonl(&path, &content[..complete])?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        if !verify_chain(&entries) {
            return Err(Error::LedgerCorrupt(format!(
                "{}: hash chain does not verify",
                path.display()
            )));
        }

        let (next_index, last_hash) = match entries.last() {
            Some(last) => (last.index + 1, last.hash.clone()),
            None => (FIRST_INDEX, genesis_hash()),
        };

        let file = OpenOptions::new().create(true).append(true).open(&path).await?;

        info!("Ledger opened: {} ({} entries, next index {})", path.display(), entries.len(), next_index);

        Ok(Self {
            state: Mutex::new(LedgerState {
                entries,
                next_index,
                last_hash,
                file: Some(file),
            }),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Validate and append a plan payload, returning its entry.
    ///
    /// Identical payloads are never deduplicated; each submission gets its own index.
    pub async fn submit(&self, payload: Value) -> Result<LedgerEntry> {
        plan::validate(&payload)?;
        self.append(payload).await
    }

    async fn append(&self, payload: Value) -> Result<LedgerEntry> {
        let payload_json = serde_json::to_string(&payload)?;

        let mut state = self.state.lock().await;
        let index = state.next_index;
        // The index is consumed even if the write below fails.
        state.next_index += 1;

        let submitted_at = Utc::now();
        let hash = compute_hash(index, &state.last_hash, &payload_json, &submitted_at);
        let entry = LedgerEntry {
            index,
            payload,
            submitted_at,
            previous_hash: state.last_hash.clone(),
            hash,
        };

        if let Some(file) = state.file.as_mut() {
            let line = serde_json::to_string(&entry)? + "\n";
            if let Err(e) = append_line(file, &line).await {
                warn!("Ledger write failed at index {}: {}", index, e);
                return Err(e.into());
            }
        }

        state.last_hash = entry.hash.clone();
        state.entries.push(entry.clone());
        debug!("Ledger append #{} {}", index, &entry.hash[..12]);
        Ok(entry)
    }

    pub async fn get(&self, index: u64) -> Result<LedgerEntry> {
        let state = self.state.lock().await;
        state
            .entries
            .binary_search_by_key(&index, |e| e.index)
            .map(|pos| state.entries[pos].clone())
            .map_err(|_| Error::EntryNotFound(index))
    }

    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.state.lock().await.entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Hash of the newest entry, or the genesis hash.
    pub async fn head_hash(&self) -> String {
        self.state.lock().await.last_hash.clone()
    }

    pub async fn next_index(&self) -> u64 {
        self.state.lock().await.next_index
    }

    /// Recompute the in-memory hash chain.
    pub async fn verify(&self) -> bool {
        let state = self.state.lock().await;
        verify_chain(&state.entries)
    }

    /// Entries whose payload text contains `search`, newest first.
    pub async fn query(&self, search: &str) -> Vec<LedgerEntry> {
        let state = self.state.lock().await;
        state
            .entries
            .iter()
            .rev()
            .filter(|e| search.is_empty() || e.payload.to_string().contains(search))
            .cloned()
            .collect()
    }

    /// Write a snapshot of the chain to `dir/ledger.jsonl` plus a
    /// `manifest.json` with the entry count and root hash.
    ///
    /// The exported file opens as a ledger of its own. Exporting over the
    /// live ledger file is refused.
    pub async fn export(&self, dir: impl AsRef<Path>) -> Result<ExportManifest> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let target = dir.join(EXPORT_LEDGER_FILE);
        if let Some(live) = &self.path {
            let live = tokio::fs::canonicalize(live).await?;
            let target_dir = tokio::fs::canonicalize(dir).await?;
            if target_dir.join(EXPORT_LEDGER_FILE) == live {
                return Err(Error::BadRequest(format!(
                    "refusing to export over the live ledger {}",
                    live.display()
                )));
            }
        }

        let (jsonl, manifest) = {
            let state = self.state.lock().await;
            let mut jsonl = String::new();
            for entry in &state.entries {
                jsonl.push_str(&serde_json::to_string(entry)?);
                jsonl.push('\n');
            }
            let manifest = ExportManifest {
                exported_at: Utc::now(),
                entries: state.entries.len(),
                first_index: state.entries.first().map(|e| e.index),
                last_index: state.entries.last().map(|e| e.index),
                root_hash: state.last_hash.clone(),
                valid: verify_chain(&state.entries),
            };
            (jsonl, manifest)
        };

        tokio::fs::write(&target, jsonl).await?;
        tokio::fs::write(
            dir.join(EXPORT_MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)? + "\n",
        )
        .await?;

        info!("Ledger exported to {} ({} entries)", dir.display(), manifest.entries);
        Ok(manifest)
    }
}

/// Append one line, cutting the file back to its previous length if the
/// write fails part way.
async fn append_line(file: &mut File, line: &str) -> std::io::Result<()> {
    let len = file.metadata().await?.len();
    let written = async {
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        if let Err(truncate) = file.set_len(len).await {
            error!("Ledger rollback to {} bytes failed: {}", len, truncate);
        }
        return Err(e);
    }
    Ok(())
}

/// Length of `content` up to its last complete line. A trailing fragment
/// without a newline is a write that never finished; it is cut from the file.
async fn drop_torn_tail(path: &Path, content: &str) -> Result<usize> {
    if content.is_empty() || content.ends_with('\n') {
        return Ok(content.len());
    }
    let complete = content.rfind('\n').map_or(0, |pos| pos + 1);
    warn!(
        "Ledger {}: dropping {} bytes of an unfinished write",
        path.display(),
        content.len() - complete
    );
    let file = OpenOptions::new().write(true).open(path).await?;
    file.set_len(complete as u64).await?;
    file.sync_all().await?;
    Ok(complete)
}

fn parse_jsonl(path: &Path, content: &str) -> Result<Vec<LedgerEntry>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<LedgerEntry>(line).map_err(|e| {
                Error::LedgerCorrupt(format!("{}:{}: {}", path.display(), n + 1, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn first_index_is_one() {
        let ledger = Ledger::in_memory();
        let entry = ledger.submit(json!({"task": "refactor auth"})).await.unwrap();
        assert_eq!(entry.index, FIRST_INDEX);
        assert_eq!(entry.previous_hash, genesis_hash());
        assert_eq!(ledger.head_hash().await, entry.hash);
    }

    #[tokio::test]
    async fn invalid_payload_consumes_no_index() {
        let ledger = Ledger::in_memory();
        assert!(matches!(ledger.submit(json!("nope")).await, Err(Error::InvalidPlan(_))));
        assert_eq!(ledger.next_index().await, FIRST_INDEX);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn failed_write_burns_the_index_and_leaves_file_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let ledger = Ledger::open(&path).await.unwrap();
        ledger.submit(json!({"task": "one"})).await.unwrap();

        // swap in a handle that cannot be written to
        let writable = {
            let read_only = File::open(&path).await.unwrap();
            let mut state = ledger.state.lock().await;
            state.file.replace(read_only)
        };
        assert!(matches!(ledger.submit(json!({"task": "lost"})).await, Err(Error::Io(_))));
        assert_eq!(ledger.len().await, 1);
        assert_eq!(ledger.next_index().await, 3);

        ledger.state.lock().await.file = writable;
        let third = ledger.submit(json!({"task": "three"})).await.unwrap();
        assert_eq!(third.index, 3);
        assert_eq!(third.previous_hash, ledger.get(1).await.unwrap().hash);
        drop(ledger);

        let reopened = Ledger::open(&path).await.unwrap();
        let indices: Vec<u64> = reopened.entries().await.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert!(reopened.verify().await);
    }

    #[tokio::test]
    async fn missing_entry_is_not_found() {
        let ledger = Ledger::in_memory();
        assert!(matches!(ledger.get(5).await, Err(Error::EntryNotFound(5))));
    }
}
