//! Axial Ledger - append-only, hash-chained record of submitted plans

pub mod chain;
pub mod store;

pub use chain::{compute_hash, genesis_hash, verify_chain};
pub use store::{Ledger, EXPORT_LEDGER_FILE, EXPORT_MANIFEST_FILE, FIRST_INDEX};
