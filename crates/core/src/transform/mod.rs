//! The dbt transformation suite and the shell runner that drives it.

mod shell;

pub use shell::ShellRunner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::TransformConfig;

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Command exited with status {code:?}: {stderr_tail}")]
    ExitStatus {
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A shell command to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Passed to `bash -c`.
    pub command: String,
    /// Working directory; inherits the current one when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

/// Output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout_lines: usize,
    pub stderr_lines: usize,
}

/// Runs shell commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. A non-zero exit is an error.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

/// One step of the dbt suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStep {
    /// Install packages.
    Deps,
    /// Slowly-changing-dimension snapshots.
    Snapshot,
    /// Static seed data.
    Seed,
    /// Build models.
    Run,
    /// Data tests.
    Test,
    /// Documentation.
    DocsGenerate,
}

impl TransformStep {
    /// Execution order.
    pub const ALL: [TransformStep; 6] = [
        TransformStep::Deps,
        TransformStep::Snapshot,
        TransformStep::Seed,
        TransformStep::Run,
        TransformStep::Test,
        TransformStep::DocsGenerate,
    ];

    /// dbt subcommand.
    pub fn subcommand(&self) -> &'static str {
        match self {
            Self::Deps => "deps",
            Self::Snapshot => "snapshot",
            Self::Seed => "seed",
            Self::Run => "run",
            Self::Test => "test",
            Self::DocsGenerate => "docs generate",
        }
    }

    /// Graph task id, e.g. `dbt_docs_generate`.
    pub fn task_id(&self) -> String {
        format!("dbt_{}", self.subcommand().replace(' ', "_"))
    }

    fn uses_profiles(&self) -> bool {
        !matches!(self, Self::Deps)
    }

    /// The command line for this step.
    pub fn command(&self, config: &TransformConfig) -> CommandSpec {
        let mut command = format!("{} {}", config.executable, self.subcommand());
        if self.uses_profiles() {
            command.push_str(&format!(
                " --profiles-dir {}",
                shell_quote(config.profiles_dir())
            ));
        }

        CommandSpec {
            command,
            cwd: Some(config.project_dir.clone()),
            timeout: Some(Duration::from_secs(config.timeout_secs)),
        }
    }
}

impl fmt::Display for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dbt {}", self.subcommand())
    }
}

fn shell_quote(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-".contains(c))
    {
        s.into_owned()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
