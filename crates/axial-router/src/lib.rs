//! Axial Router — routes free-text tasks to executors
//!
//! Executors are self-contained units implementing the Executor trait (see
//! src/executors/). Which executor handles a task is decided by a named
//! RoutingPolicy; the Router enforces timeouts, cancellation and per-executor
//! concurrency around the dispatch.

pub mod executor;
pub mod executors;
pub mod policy;
pub mod router;

pub use executor::{Executor, ExecutorError, ExecutorRegistry, ExecutorResult, ExecutorSlot};
pub use policy::{
    Candidate, CapabilityPolicy, ChainPolicy, LocalFirstPolicy, RoutePlan, RoutingPolicy, StaticPolicy,
};
pub use router::Router;
pub use tokio_util::sync::CancellationToken;
