//! CLI-specific functionality for mclone
//!
//! This module contains all CLI-related code including argument parsing,
//! configuration discovery and the `info` report.

pub mod args;
pub mod config;
pub mod report;

pub use args::{Args, Commands, NewTaskArgs, TaskCommand, TaskSettings, VolumeCommand};
pub use config::{ConfigDiscovery, ConfigError, McloneConfig};
pub use report::render_info;
