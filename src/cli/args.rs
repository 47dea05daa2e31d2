//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `info`: List loaded volumes, intact and stale tasks (default)
//! - `volume new|delete`: Volume lifecycle
//! - `task new|modify|delete|process`: Task lifecycle and execution
//! - `show-config`: Show configuration discovery information

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::Result;
use crate::session::SessionOptions;
use crate::task::{CrypterMode, Mode, TaskChanges, TaskOptions};

#[derive(Debug, Parser)]
#[command(name = "mclone")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rclone-based file synchronization across removable volumes")]
#[command(long_about = None)]
pub struct Args {
    /// Insist on potentially dangerous actions
    #[arg(short = 'f', long = "force", global = true)]
    pub force: bool,
    /// Simulation mode with no on-disk modifications
    #[arg(short = 'n', long = "dry-run", global = true)]
    pub dry_run: bool,
    /// Verbose operation
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Output information on volumes & tasks
    Info,
    /// Volume operations
    #[command(subcommand)]
    Volume(VolumeCommand),
    /// Task operations
    #[command(subcommand)]
    Task(TaskCommand),
    /// Show configuration discovery information
    ShowConfig,
}

#[derive(Debug, Subcommand)]
pub enum VolumeCommand {
    /// Create new volume
    #[command(visible_alias = "create")]
    New {
        /// Directory to become a Mclone volume
        directory: PathBuf,
    },
    /// Delete existing volume
    Delete {
        /// Volume ID pattern
        volume: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Create new SOURCE -> DESTINATION task
    #[command(visible_alias = "create")]
    New(NewTaskArgs),
    /// Modify existing task
    Modify {
        #[command(flatten)]
        settings: TaskSettings,
        /// Task ID pattern
        task: String,
    },
    /// Delete existing task
    Delete {
        /// Task ID pattern
        task: String,
    },
    /// Process specified tasks (all intact tasks when none given)
    Process {
        /// Task ID patterns
        tasks: Vec<String>,
    },
}

/// Settings shared by task creation and modification
#[derive(Debug, ClapArgs)]
pub struct TaskSettings {
    /// Operation mode (update | synchronize | copy | move), any unambiguous pattern
    #[arg(short = 'm', long = "mode", value_name = "MODE")]
    pub mode: Option<String>,
    /// Include paths pattern
    #[arg(short = 'i', long = "include", value_name = "PATTERN")]
    pub include: Option<String>,
    /// Exclude paths pattern
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    pub exclude: Option<String>,
}

#[derive(Debug, ClapArgs)]
pub struct NewTaskArgs {
    #[command(flatten)]
    pub settings: TaskSettings,
    /// Decrypt source
    #[arg(short = 'd', long = "decrypt", conflicts_with = "encrypt")]
    pub decrypt: bool,
    /// Encrypt destination
    #[arg(short = 'e', long = "encrypt")]
    pub encrypt: bool,
    /// Plain text password
    #[arg(short = 'p', long = "password", conflicts_with = "token")]
    pub password: Option<String>,
    /// Rclone crypt token (obscured password)
    #[arg(short = 't', long = "token")]
    pub token: Option<String>,
    /// Source path
    pub source: PathBuf,
    /// Destination path
    pub destination: PathBuf,
}

impl Args {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            force: self.force,
            simulate: self.dry_run,
            verbose: self.verbose,
        }
    }
}

impl TaskSettings {
    fn mode(&self) -> Result<Option<Mode>> {
        self.mode.as_deref().map(Mode::resolve).transpose()
    }

    pub fn changes(&self) -> Result<TaskChanges> {
        Ok(TaskChanges {
            mode: self.mode()?,
            include: self.include.clone(),
            exclude: self.exclude.clone(),
        })
    }
}

impl NewTaskArgs {
    pub fn options(&self) -> Result<TaskOptions> {
        let crypter_mode = if self.encrypt {
            Some(CrypterMode::Encrypt)
        } else if self.decrypt {
            Some(CrypterMode::Decrypt)
        } else {
            None
        };
        Ok(TaskOptions {
            mode: self.settings.mode()?.unwrap_or_default(),
            include: self.settings.include.clone(),
            exclude: self.settings.exclude.clone(),
            crypter_mode,
            password: self.password.clone(),
            token: self.token.clone(),
        })
    }
}
