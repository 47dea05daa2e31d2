//! Rclone argument vectors.
//!
//! Mclone never moves data itself: each task becomes one `rclone` invocation
//! whose operation, filters and endpoints are decided here.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{CommandRunner, ExecutionCommand, ExecutionResult, ExecutorError};
use crate::env;
use crate::task::{CrypterMode, Mode, Task};

/// Flags forwarded to every transfer
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferFlags {
    pub dry_run: bool,
    pub verbose: bool,
}

/// Handle on the Rclone program and the runner used to invoke it
#[derive(Clone)]
pub struct Rclone {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl Rclone {
    pub fn new(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Obscure a plain text password into a crypt token (`rclone obscure -`).
    ///
    /// The password travels on standard input and never shows up in the
    /// process table.
    pub async fn obscure(&self, password: &str) -> Result<String, ExecutorError> {
        let cmd = ExecutionCommand::new(
            self.program.clone(),
            vec!["obscure".to_string(), "-".to_string()],
        )
        .with_stdin(password);
        let result = self.runner.execute(cmd).await?;
        if !result.success() {
            return Err(ExecutorError::ExecutionFailed {
                program: self.program.clone(),
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        let token = result.stdout.trim();
        if token.is_empty() {
            return Err(ExecutorError::Other(format!(
                "\"{} obscure\" produced no output",
                self.program
            )));
        }
        Ok(token.to_string())
    }

    /// Build the transfer command for `task` between the given absolute endpoints
    pub fn transfer_command(
        &self,
        task: &Task,
        source: &Path,
        destination: &Path,
        token: Option<&str>,
        flags: TransferFlags,
    ) -> ExecutionCommand {
        let mut args = Vec::new();
        let (operation, update) = match task.mode() {
            Mode::Update => ("copy", true),
            Mode::Synchronize => ("sync", false),
            Mode::Copy => ("copy", false),
            Mode::Move => ("move", false),
        };
        args.push(operation.to_string());
        if flags.dry_run {
            args.push("--dry-run".to_string());
        }
        if flags.verbose {
            args.push("--verbose".to_string());
        }
        if update {
            args.push("--update".to_string());
        }
        args.push("--filter".to_string());
        args.push(format!("- /{}", env::VOLUME_FILE_NAME));
        if let Some(exclude) = task.exclude() {
            args.push("--filter".to_string());
            args.push(format!("- {exclude}"));
        }
        if let Some(include) = task.include() {
            args.push("--filter".to_string());
            args.push(format!("+ {include}"));
        }

        let mut source = source.to_string_lossy().into_owned();
        let mut destination = destination.to_string_lossy().into_owned();
        match (task.crypter_mode(), token) {
            (Some(CrypterMode::Encrypt), Some(token)) => destination = crypt_remote(&destination, token),
            (Some(CrypterMode::Decrypt), Some(token)) => source = crypt_remote(&source, token),
            _ => {}
        }
        args.push(source);
        args.push(destination);

        let mut cmd = ExecutionCommand::new(self.program.clone(), args).passthrough();
        if let Some(token) = token {
            cmd = cmd.with_secret(token);
        }
        cmd
    }

    /// Run a transfer command, reporting the child's outcome
    pub async fn run(&self, cmd: ExecutionCommand) -> Result<ExecutionResult, ExecutorError> {
        info!("Running {}", cmd.display());
        let result = self.runner.execute(cmd).await?;
        debug!(
            "{} ({}) finished with code {} in {}ms",
            self.program,
            self.runner.executor_type(),
            result.exit_code,
            result.duration.as_millis()
        );
        Ok(result)
    }
}

/// On-the-fly crypt remote wrapping a local directory
fn crypt_remote(path: &str, token: &str) -> String {
    format!(
        ":crypt,remote=\"{}\",password={}:",
        path.replace('"', "\"\""),
        token
    )
}
