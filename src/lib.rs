//! # Mclone
//!
//! Rclone-based file synchronization across removable volumes. Each volume is a
//! directory carrying a `.mclone` manifest that replicates every sync task
//! concerning it, so plugging any subset of volumes in is enough to recover and
//! run the tasks between them.
//!
//! ## Architecture Overview
//!
//! - **[`identity`]**: the two-way collection every set of tasks and volumes is built on
//! - **[`task`]**: task definitions, their manifest records and crypt credentials
//! - **[`volume`]**: volumes and their crash-safe manifests
//! - **[`session`]**: the loaded volumes, the merged tasks and every user operation
//! - **[`executor`]**: running Rclone
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use mclone::executor::{HostExecutor, Rclone};
//! use mclone::{Session, SessionOptions, TaskOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let rclone = Rclone::new("rclone", Arc::new(HostExecutor::new()));
//!     let mut session = Session::new(rclone, SessionOptions::default());
//!     session.restore_volumes(["/media/usb1", "/media/usb2"])?;
//!
//!     session.create_task(
//!         Path::new("/media/usb1/photos"),
//!         Path::new("/media/usb2/photos"),
//!         TaskOptions::default(),
//!     )?;
//!     session.commit().await?;
//!     session.process_tasks(&[]).await?;
//!     Ok(())
//! }
//! ```

/// Environment constants and path utilities.
///
/// Centralizes all hardcoded file names and variables used throughout
/// the application for easier maintenance and consistency.
pub mod env;

pub mod error;

/// External tool execution.
pub mod executor;

pub mod identity;

/// Volume discovery on the running system.
pub mod mounts;

/// Session orchestration: restore, edit, commit and process.
pub mod session;

/// Task definitions and credentials.
pub mod task;

pub mod volume;

// CLI module for command-line interface
pub mod cli;

pub use error::{McloneError, Result};
pub use identity::{IdentitySet, Identified};
pub use session::{Session, SessionOptions};
pub use task::{CrypterMode, Endpoint, Mode, Task, TaskChanges, TaskOptions};
pub use volume::Volume;
