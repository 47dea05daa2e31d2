//! # External Tool Execution
//!
//! Everything that leaves the process goes through here: the transfer itself and
//! the password obscuring call are both delegated to Rclone, run as a blocking
//! child process awaited one at a time.
//!
//! ## Core Components
//!
//! - **[`CommandRunner`]**: the seam between the session and the operating system
//! - **[`HostExecutor`]**: runs commands on the host via `tokio::process::Command`
//! - **[`Rclone`]**: builds Rclone argument vectors for transfers and `obscure`
//! - **[`ExecutionCommand`]** / **[`ExecutionResult`]**: what to run and how it went
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use mclone::executor::{CommandRunner, ExecutionCommand, HostExecutor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = HostExecutor::new();
//!     let command = ExecutionCommand::new("rclone", vec!["version".to_string()]);
//!
//!     let result = executor.execute(command).await?;
//!     println!("Exit code: {}", result.exit_code);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use std::time::Duration;

/// Host-based command execution.
pub mod host;

/// Rclone invocation builder.
pub mod rclone;

pub use host::HostExecutor;
pub use rclone::Rclone;

/// Result of command execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Standard output (empty when the output was passed through)
    pub stdout: String,
    /// Standard error (empty when the output was passed through)
    pub stderr: String,
    /// Exit code (0 = success, non-zero = failure)
    pub exit_code: i32,
    pub duration: Duration,
}

impl ExecutionResult {
    /// Check if the command executed successfully (exit code 0)
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Command to execute
#[derive(Debug, Clone)]
pub struct ExecutionCommand {
    /// Program name or path to execute
    pub program: String,
    pub args: Vec<String>,
    /// Fed to the child's standard input, which is closed afterwards
    pub stdin: Option<String>,
    /// Let the child write straight to our stdout/stderr instead of capturing
    pub passthrough: bool,
    /// Values masked out of [`display`](Self::display)
    pub secrets: Vec<String>,
}

impl ExecutionCommand {
    /// Create a new command with just program and args
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            stdin: None,
            passthrough: false,
            secrets: Vec::new(),
        }
    }

    /// Send `input` on the child's standard input
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Pass the child's output through to the terminal
    pub fn passthrough(mut self) -> Self {
        self.passthrough = true;
        self
    }

    /// Mark `value` as a secret to keep out of logs
    pub fn with_secret(mut self, value: impl Into<String>) -> Self {
        self.secrets.push(value.into());
        self
    }

    /// Shell-quoted command line for logs, secrets masked
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|arg| {
                let masked = self
                    .secrets
                    .iter()
                    .filter(|secret| !secret.is_empty())
                    .fold(arg.clone(), |acc, secret| acc.replace(secret.as_str(), "***"));
                shell_escape::escape(masked.into()).into_owned()
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Errors during command execution
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The program could not be found
    #[error("failed to locate \"{program}\": {reason}")]
    NotFound { program: String, reason: String },

    /// Command ran but reported failure
    #[error("\"{program}\" exited with code {exit_code}: {stderr}")]
    ExecutionFailed {
        program: String,
        exit_code: i32,
        stderr: String,
    },

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Runs external commands to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(&self, cmd: ExecutionCommand) -> Result<ExecutionResult, ExecutorError>;

    /// Executor type name for logging
    fn executor_type(&self) -> &'static str;
}
