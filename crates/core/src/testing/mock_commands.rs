//! Mock command runner for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transform::{CommandError, CommandOutput, CommandRunner, CommandSpec};

/// Mock implementation of the CommandRunner trait.
///
/// Records every command without running it. Commands containing a
/// registered substring exit with status 1.
#[derive(Debug, Default)]
pub struct MockCommandRunner {
    commands: Arc<RwLock<Vec<CommandSpec>>>,
    failing: Arc<RwLock<Vec<String>>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every command containing `needle`.
    pub async fn fail_matching(&self, needle: &str) {
        self.failing.write().await.push(needle.to_string());
    }

    /// Commands run so far, in order.
    pub async fn commands(&self) -> Vec<CommandSpec> {
        self.commands.read().await.clone()
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        self.commands.write().await.push(spec.clone());

        if self
            .failing
            .read()
            .await
            .iter()
            .any(|n| spec.command.contains(n.as_str()))
        {
            return Err(CommandError::ExitStatus {
                code: Some(1),
                stderr_tail: format!("mock failure: {}", spec.command),
            });
        }

        Ok(CommandOutput {
            stdout_lines: 1,
            stderr_lines: 0,
        })
    }
}
