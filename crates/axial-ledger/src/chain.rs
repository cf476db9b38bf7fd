//! SHA-256 hash chain over ledger entries
//!
//! hash(n) = sha256(index_be || previous_hash || payload_json || submitted_at_rfc3339)

use axial_core::LedgerEntry;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Previous-hash value of the first entry.
pub fn genesis_hash() -> String {
    "0".repeat(64)
}

pub fn compute_hash(
    index: u64,
    previous_hash: &str,
    payload_json: &str,
    submitted_at: &DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(index.to_be_bytes());
    hasher.update(previous_hash.as_bytes());
    hasher.update(payload_json.as_bytes());
    hasher.update(submitted_at.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())
}

/// Recompute every link. Indices must strictly increase; gaps are allowed
/// because an index burned by a failed write is never handed out again.
pub fn verify_chain(entries: &[LedgerEntry]) -> bool {
    let mut previous = genesis_hash();
    let mut last_index: Option<u64> = None;

    for entry in entries {
        if last_index.is_some_and(|last| entry.index <= last) {
            return false;
        }
        if entry.previous_hash != previous {
            return false;
        }
        let payload_json = match serde_json::to_string(&entry.payload) {
            Ok(s) => s,
            Err(_) => return false,
        };
        let computed = compute_hash(entry.index, &entry.previous_hash, &payload_json, &entry.submitted_at);
        if computed != entry.hash {
            return false;
        }
        previous = entry.hash.clone();
        last_index = Some(entry.index);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(index: u64, previous: &str, payload: serde_json::Value) -> LedgerEntry {
        let submitted_at = Utc::now();
        let hash = compute_hash(index, previous, &payload.to_string(), &submitted_at);
        LedgerEntry {
            index,
            payload,
            submitted_at,
            previous_hash: previous.to_string(),
            hash,
        }
    }

    #[test]
    fn hash_is_hex_sha256() {
        let h = compute_hash(1, &genesis_hash(), "{}", &Utc::now());
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn empty_chain_verifies() {
        assert!(verify_chain(&[]));
    }

    #[test]
    fn linked_entries_verify_and_tampering_is_detected() {
        let a = entry(1, &genesis_hash(), json!({"task": "a"}));
        let b = entry(2, &a.hash, json!({"task": "b"}));
        assert!(verify_chain(&[a.clone(), b.clone()]));

        let mut tampered = b.clone();
        tampered.payload = json!({"task": "evil"});
        assert!(!verify_chain(&[a.clone(), tampered]));

        assert!(!verify_chain(&[b, a]));
    }

    #[test]
    fn gaps_are_allowed_but_not_reordering() {
        let a = entry(1, &genesis_hash(), json!({"n": 1}));
        let c = entry(3, &a.hash, json!({"n": 3}));
        assert!(verify_chain(&[a.clone(), c]));

        let dup = entry(1, &a.hash, json!({"n": 1}));
        assert!(!verify_chain(&[a, dup]));
    }
}
