//! Axial Core - Types, plan schema, wire protocol, configuration and error handling

pub mod config;
pub mod error;
pub mod plan;
pub mod protocol;
pub mod types;

pub use config::AxialConfig;
pub use error::{Error, ErrorKind, Result};
pub use protocol::*;
pub use types::*;
