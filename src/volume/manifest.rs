//! On-disk manifest format and crash-safe writes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::env;
use crate::error::{McloneError, Result};
use crate::task::TaskRecord;

/// Contents of a volume's `.mclone` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version
    pub mclone: i64,
    pub volume: String,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

#[derive(Deserialize)]
struct Header {
    mclone: i64,
}

impl Manifest {
    pub fn new(volume: impl Into<String>, tasks: Vec<TaskRecord>) -> Self {
        Self {
            mclone: env::VOLUME_FORMAT_VERSION,
            volume: volume.into(),
            tasks,
        }
    }

    /// Read and validate the manifest at `path`.
    ///
    /// The version gate runs before the body is interpreted, so a newer format
    /// is reported as such rather than as a parse failure.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => McloneError::ManifestNotFound {
                path: path.to_path_buf(),
            },
            _ => McloneError::io(path, e),
        })?;
        let malformed = |source| McloneError::MalformedManifest {
            path: path.to_path_buf(),
            source,
        };
        let header: Header = serde_json::from_str(&content).map_err(malformed)?;
        if header.mclone != env::VOLUME_FORMAT_VERSION {
            return Err(McloneError::UnsupportedVersion {
                path: path.to_path_buf(),
                version: header.mclone,
            });
        }
        serde_json::from_str(&content).map_err(malformed)
    }

    /// Replace the file at `path` with this manifest, atomically.
    pub fn store(&self, path: &Path) -> Result<u64> {
        let data = serde_json::to_vec_pretty(self).map_err(|source| McloneError::MalformedManifest {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, &data)?;
        Ok(data.len() as u64)
    }
}

/// Fully written sibling of a file about to be replaced.
///
/// Dropped without [`persist`](Self::persist), it is removed and the target
/// stays as it was.
pub(crate) struct TempFile(PathBuf);

impl TempFile {
    /// Rename over `path`, completing the replacement
    pub(crate) fn persist(self, path: &Path) -> Result<()> {
        fs::rename(&self.0, path).map_err(|e| McloneError::io(path, e))
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0)
            && e.kind() != ErrorKind::NotFound
        {
            warn!("Failed to cleanup temp file {}: {}", self.0.display(), e);
        }
    }
}

/// Path of the sibling temporary file used while replacing `path`
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| env::VOLUME_FILE_NAME.to_string());
    path.with_file_name(format!("{name}.tmp.{}", uuid::Uuid::new_v4().simple()))
}

/// Write and sync `data` next to `path`, without touching `path` itself
pub(crate) fn write_temp(path: &Path, data: &[u8]) -> Result<TempFile> {
    let temp = TempFile(temp_path_for(path));
    let mut file = fs::File::create(&temp.0).map_err(|e| McloneError::io(&temp.0, e))?;
    file.write_all(data)
        .and_then(|()| file.sync_all())
        .map_err(|e| McloneError::io(&temp.0, e))?;
    Ok(temp)
}

/// Write `data` to a sibling temporary file, then rename it over `path`.
///
/// Until the rename the original file stays byte-identical.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    write_temp(path, data)?.persist(path)?;
    debug!("Replaced {} ({} bytes)", path.display(), data.len());
    Ok(())
}
