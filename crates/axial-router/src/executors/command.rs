//! Command executor — runs an agent CLI as a child process
//!
//! `{task}` in the configured args is replaced by the task text; without a
//! placeholder the task is appended as the final argument. The child is
//! spawned with kill_on_drop, so a timed-out or cancelled route kills it.

use crate::executor::{Executor, ExecutorError, ExecutorResult};
use axial_core::PrivacyLevel;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

const TASK_PLACEHOLDER: &str = "{task}";

pub struct CommandExecutor {
    name: String,
    program: String,
    args: Vec<String>,
    capabilities: Vec<String>,
    privacy: PrivacyLevel,
}

impl CommandExecutor {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            capabilities: Vec::new(),
            privacy: PrivacyLevel::Local,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_privacy(mut self, privacy: PrivacyLevel) -> Self {
        self.privacy = privacy;
        self
    }

    /// Final argument list for one task.
    pub fn render_args(&self, task: &str) -> Vec<String> {
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(TASK_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(TASK_PLACEHOLDER, task)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(task.to_string());
        }
        args
    }
}

#[async_trait::async_trait]
impl Executor for CommandExecutor {
    fn name(&self) -> &str { &self.name }

    fn capabilities(&self) -> &[String] { &self.capabilities }

    fn privacy(&self) -> PrivacyLevel { self.privacy }

    async fn execute(&self, task: &str) -> ExecutorResult<String> {
        let args = self.render_args(task);
        debug!("{}: {} {:?}", self.name, self.program, args);

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command.spawn()?.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if output.status.success() {
            Ok(stdout)
        } else {
            Err(ExecutorError::Exit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_substituted() {
        let exec = CommandExecutor::new("claude", "claude", vec!["-p".into(), "{task}".into()]);
        assert_eq!(exec.render_args("fix it"), vec!["-p", "fix it"]);
    }

    #[test]
    fn task_is_appended_without_placeholder() {
        let exec = CommandExecutor::new("aider", "aider", vec!["--yes".into(), "--message".into()]);
        assert_eq!(exec.render_args("fix it"), vec!["--yes", "--message", "fix it"]);
    }

    #[test]
    fn placeholder_inside_an_argument() {
        let exec = CommandExecutor::new("x", "x", vec!["--prompt={task}".into()]);
        assert_eq!(exec.render_args("go"), vec!["--prompt=go"]);
    }
}
