//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Current directory: ./mclone.toml or ./.mclone.d/config.toml
//! 2. User config: ~/.mclone.d/config.toml
//! 3. System config: /etc/mclone/config.toml
//! 4. Built-in defaults
//!
//! Environment variables are applied on top of whichever source won.

use crate::env;
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McloneConfig {
    /// Rclone program, either a path or a name looked up on `PATH`
    pub rclone: String,
    /// Directories scanned for volumes, in order
    pub search_paths: Vec<PathBuf>,
    /// Also scan the mount points of the running system
    pub scan_system_mounts: bool,
}

impl Default for McloneConfig {
    fn default() -> Self {
        Self {
            rclone: env::DEFAULT_RCLONE.to_string(),
            search_paths: Vec::new(),
            scan_system_mounts: true,
        }
    }
}

impl McloneConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply the `RCLONE` and `MCLONE_PATH` environment variables
    pub fn apply_env(self) -> Self {
        self.with_overrides(
            std_env::var(env::vars::RCLONE).ok(),
            std_env::var(env::vars::MCLONE_PATH).ok(),
        )
    }

    /// Replace the program and prepend extra search paths
    pub fn with_overrides(mut self, rclone: Option<String>, search_path_list: Option<String>) -> Self {
        if let Some(rclone) = rclone.filter(|s| !s.is_empty()) {
            debug!("Rclone program overridden: {}", rclone);
            self.rclone = rclone;
        }
        if let Some(list) = search_path_list {
            let mut search_paths = env::split_path_list(&list);
            search_paths.append(&mut self.search_paths);
            self.search_paths = search_paths;
        }
        self
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<McloneConfig, ConfigError> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return McloneConfig::from_toml_file(config_path);
        }

        debug!("No configuration file found, using defaults");
        Ok(McloneConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = Self::config_candidates();

        for candidate in candidates {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        None
    }

    /// List of configuration file candidates in priority order
    fn config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join(env::LOCAL_CONFIG_FILE_NAME));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from(env::SYSTEM_CONFIG_FILE));

        #[cfg(windows)]
        if let Ok(program_data) = std_env::var("PROGRAMDATA") {
            candidates.push(
                PathBuf::from(program_data)
                    .join("mclone")
                    .join(env::CONFIG_FILE_NAME),
            );
        }

        candidates
    }

    fn home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        let candidates = Self::config_candidates();
        for (i, candidate) in candidates.iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        if let Some(found) = Self::find_config_file() {
            println!("Active configuration: {:?}", found);
        } else {
            println!("Active configuration: Built-in defaults");
        }
    }
}
