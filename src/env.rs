//! Environment constants and path utilities for mclone.
//!
//! This module centralizes all hardcoded file names, environment variables and
//! directory names used throughout the application.

use std::path::{Path, PathBuf};

/// Manifest file name at the root of every volume
pub const VOLUME_FILE_NAME: &str = ".mclone";

/// Manifest format version written and accepted
pub const VOLUME_FORMAT_VERSION: i64 = 0;

/// Per-user/per-directory configuration directory name
pub const CONFIG_DIR_NAME: &str = ".mclone.d";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up directly in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "mclone.toml";

/// System-wide configuration file
#[cfg(unix)]
pub const SYSTEM_CONFIG_FILE: &str = "/etc/mclone/config.toml";

/// Environment variables
pub mod vars {
    /// Rclone program override
    pub const RCLONE: &str = "RCLONE";

    /// Extra directories to scan for volumes, separated like `PATH`
    pub const MCLONE_PATH: &str = "MCLONE_PATH";
}

/// Default Rclone program name, looked up on `PATH`
pub const DEFAULT_RCLONE: &str = "rclone";

/// Separator of path lists in environment variables
#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: char = ':';

/// Build the manifest path of a volume rooted at `dir`
pub fn volume_file_path(dir: &Path) -> PathBuf {
    dir.join(VOLUME_FILE_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    home_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Split a `PATH`-like list, dropping empty entries
pub fn split_path_list(list: &str) -> Vec<PathBuf> {
    list.split(PATH_LIST_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
