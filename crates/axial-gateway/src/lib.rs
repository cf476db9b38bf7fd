//! Axial Gateway - service state, HTTP API and the daemon client

pub mod client;
pub mod server;
pub mod service;

pub use client::DaemonClient;
pub use server::{app, serve, ApiError};
pub use service::AxialService;
