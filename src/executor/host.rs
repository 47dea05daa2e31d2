//! Native host command execution.
//!
//! Executes commands directly on the host system using `tokio::process::Command`.

use super::{CommandRunner, ExecutionCommand, ExecutionResult, ExecutorError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::debug;

/// Executes commands directly on the host system
#[derive(Debug, Clone)]
pub struct HostExecutor;

impl HostExecutor {
    /// Create a new host executor
    pub fn new() -> Self {
        Self
    }
}

impl Default for HostExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for HostExecutor {
    async fn execute(&self, cmd: ExecutionCommand) -> Result<ExecutionResult, ExecutorError> {
        debug!("Executing command on host: {}", cmd.display());

        let program = which::which(&cmd.program).map_err(|e| ExecutorError::NotFound {
            program: cmd.program.clone(),
            reason: e.to_string(),
        })?;

        let start = Instant::now();

        let mut command = Command::new(program);
        command.args(&cmd.args).stdin(if cmd.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let (stdout, stderr, status) = if cmd.passthrough {
            let mut child = command.spawn()?;
            feed_stdin(&mut child, cmd.stdin.as_deref()).await?;
            let status = child.wait().await?;
            (String::new(), String::new(), status)
        } else {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
            let mut child = command.spawn()?;
            feed_stdin(&mut child, cmd.stdin.as_deref()).await?;
            let output = child.wait_with_output().await?;
            (
                String::from_utf8_lossy(&output.stdout).to_string(),
                String::from_utf8_lossy(&output.stderr).to_string(),
                output.status,
            )
        };

        Ok(ExecutionResult {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    fn executor_type(&self) -> &'static str {
        "host"
    }
}

/// Write `input` to the child and close its standard input
async fn feed_stdin(child: &mut Child, input: Option<&str>) -> std::io::Result<()> {
    if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
        stdin.write_all(input.as_bytes()).await?;
    }
    Ok(())
}
