//! Error types shared by the volume, task and session layers.

use std::path::PathBuf;
use thiserror::Error;

use crate::cli::config::ConfigError;
use crate::executor::ExecutorError;

/// Library-wide result alias
pub type Result<T> = std::result::Result<T, McloneError>;

#[derive(Debug, Error)]
pub enum McloneError {
    #[error("unknown mode \"{0}\"")]
    UnknownMode(String),

    #[error("unknown crypter mode \"{0}\"")]
    UnknownCrypterMode(String),

    #[error("specify either plain text password or Rclone crypt token, not both")]
    ConflictingCredentialInput,

    #[error("conflicting crypt token registered for task \"{task}\"")]
    CredentialConflict { task: String },

    #[error("no {kind} matching \"{pattern}\" pattern found")]
    NoMatch { kind: &'static str, pattern: String },

    #[error("ambiguous \"{pattern}\" pattern: two or more {kind}s match")]
    Ambiguous { kind: &'static str, pattern: String },

    #[error("invalid pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("unsupported Mclone volume format version \"{version}\" in '{path}'")]
    UnsupportedVersion { path: PathBuf, version: i64 },

    #[error("malformed Mclone volume file '{path}': {source}")]
    MalformedManifest {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Mclone volume file '{path}' not found")]
    ManifestNotFound { path: PathBuf },

    #[error("path '{path}' does not belong to a loaded Mclone volume")]
    OutsideVolume { path: PathBuf },

    #[error("refuse to overwrite existing task \"{0}\"")]
    TaskExists(String),

    #[error("refuse to overwrite existing Mclone volume file '{0}'")]
    VolumeExists(PathBuf),

    #[error("refuse to delete non-empty Mclone volume file '{0}'")]
    VolumeNotEmpty(PathBuf),

    #[error("volume \"{0}\" is not loaded")]
    VolumeNotLoaded(String),

    #[error("failed to derive crypt token for task \"{task}\": {reason}")]
    TokenDerivation { task: String, reason: String },

    #[error("transfer failed for task(s): {}", .0.join(", "))]
    TransferFailed(Vec<String>),

    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl McloneError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
