//! Built-in executor implementations

pub mod command;
pub mod echo;
pub mod ollama;

pub use command::CommandExecutor;
pub use echo::EchoExecutor;
pub use ollama::OllamaExecutor;

use crate::executor::Executor;
use axial_core::config::{ExecutorConfig, ExecutorKind};
use axial_core::{Error, Result};
use std::sync::Arc;

/// Instantiate one configured executor.
pub fn build(config: &ExecutorConfig) -> Result<Arc<dyn Executor>> {
    let executor: Arc<dyn Executor> = match config.kind {
        ExecutorKind::Command => {
            let program = config.program.clone().ok_or_else(|| {
                Error::Config(format!("executor '{}' has kind = \"command\" but no program", config.name))
            })?;
            Arc::new(
                CommandExecutor::new(&config.name, program, config.args.clone())
                    .with_capabilities(config.capabilities.clone())
                    .with_privacy(config.privacy),
            )
        }
        ExecutorKind::Ollama => {
            let mut ollama = OllamaExecutor::new(&config.name)
                .with_capabilities(config.capabilities.clone())
                .with_privacy(config.privacy);
            if let Some(base_url) = &config.base_url {
                ollama = ollama.with_base_url(base_url);
            }
            if let Some(model) = &config.model {
                ollama = ollama.with_model(model);
            }
            Arc::new(ollama)
        }
        ExecutorKind::Echo => Arc::new(
            EchoExecutor::named(&config.name).with_capabilities(config.capabilities.clone()),
        ),
    };
    Ok(executor)
}
