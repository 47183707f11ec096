//! `bash -c` command runner.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use super::{CommandError, CommandOutput, CommandRunner, CommandSpec};

/// Lines of stderr kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Runs commands through `bash -c`, forwarding output to the log.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            shell: "bash".to_string(),
        }
    }

    /// Use a different shell binary (must accept `-c`).
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&spec.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        info!(command = %spec.command, cwd = ?spec.cwd, "Running command");
        let mut child = command.spawn().map_err(CommandError::Spawn)?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let execution = async {
            let stdout_task = async {
                let mut count = 0usize;
                if let Some(stdout) = stdout {
                    let mut lines = BufReader::new(stdout).lines();
                    while let Some(line) = lines.next_line().await? {
                        info!(target: "hoopline::command", "{}", line);
                        count += 1;
                    }
                }
                Ok::<usize, std::io::Error>(count)
            };

            let stderr_task = async {
                let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut count = 0usize;
                if let Some(stderr) = stderr {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Some(line) = lines.next_line().await? {
                        warn!(target: "hoopline::command", "{}", line);
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                        count += 1;
                    }
                }
                Ok::<(usize, VecDeque<String>), std::io::Error>((count, tail))
            };

            let (stdout_lines, stderr_result) = tokio::join!(stdout_task, stderr_task);
            let (stderr_lines, tail) = stderr_result?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, stdout_lines?, stderr_lines, tail))
        };

        let result = match spec.timeout {
            Some(limit) => match timeout(limit, execution).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(command = %spec.command, "Command timed out");
                    return Err(CommandError::Timeout(limit));
                }
            },
            None => execution.await,
        };

        let (status, stdout_lines, stderr_lines, tail) = result?;
        if !status.success() {
            return Err(CommandError::ExitStatus {
                code: status.code(),
                stderr_tail: Vec::from(tail).join("\n"),
            });
        }

        Ok(CommandOutput {
            stdout_lines,
            stderr_lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn spec(command: &str) -> CommandSpec {
        CommandSpec {
            command: command.to_string(),
            cwd: None,
            timeout: Some(Duration::from_secs(10)),
        }
    }

    #[tokio::test]
    async fn test_successful_command_counts_lines() {
        let output = ShellRunner::with_shell("sh")
            .run(&spec("echo one; echo two; echo oops >&2"))
            .await
            .unwrap();
        assert_eq!(output.stdout_lines, 2);
        assert_eq!(output.stderr_lines, 1);
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr_tail() {
        let err = ShellRunner::with_shell("sh")
            .run(&spec("echo broken >&2; exit 3"))
            .await
            .unwrap_err();
        match err {
            CommandError::ExitStatus { code, stderr_tail } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr_tail, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = TempDir::new().unwrap();
        let mut spec = spec("touch marker");
        spec.cwd = Some(dir.path().to_path_buf());
        ShellRunner::with_shell("sh").run(&spec).await.unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut spec = spec("sleep 5");
        spec.timeout = Some(Duration::from_millis(100));
        let err = ShellRunner::with_shell("sh").run(&spec).await.unwrap_err();
        assert!(matches!(err, CommandError::Timeout(_)));
    }
}
