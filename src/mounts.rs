//! Candidate directories that may hold volumes.

use indexmap::IndexSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::config::McloneConfig;

/// Pseudo filesystems never scanned for volumes
const IGNORED_MOUNT_ROOTS: [&str; 4] = ["/dev", "/sys", "/proc", "/run"];

/// Existing directories to look for volumes in: configured search paths first,
/// then system mount points when enabled. Duplicates are dropped.
pub fn candidate_dirs(config: &McloneConfig) -> Vec<PathBuf> {
    let mut dirs: IndexSet<PathBuf> = config.search_paths.iter().cloned().collect();
    if config.scan_system_mounts {
        dirs.extend(system_mounts());
    }
    dirs.into_iter()
        .filter(|dir| {
            let keep = dir.is_dir();
            if !keep {
                debug!("Skipping {}: not a directory", dir.display());
            }
            keep
        })
        .collect()
}

/// Mount points of the running system
#[cfg(target_os = "linux")]
pub fn system_mounts() -> Vec<PathBuf> {
    match std::fs::read_to_string("/proc/self/mounts") {
        Ok(content) => parse_mounts(&content),
        Err(e) => {
            debug!("Cannot read mount table: {}", e);
            Vec::new()
        }
    }
}

/// Mount points of the running system
#[cfg(windows)]
pub fn system_mounts() -> Vec<PathBuf> {
    (b'A'..=b'Z')
        .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
        .filter(|drive| drive.exists())
        .collect()
}

/// Mount points of the running system
#[cfg(not(any(target_os = "linux", windows)))]
pub fn system_mounts() -> Vec<PathBuf> {
    Vec::new()
}

/// Mount points listed in a `/proc/self/mounts`-style table
pub fn parse_mounts(table: &str) -> Vec<PathBuf> {
    table
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(|field| PathBuf::from(unescape_octal(field)))
        .filter(|path| !IGNORED_MOUNT_ROOTS.iter().any(|root| path.starts_with(Path::new(root))))
        .collect()
}

/// Decode the `\ooo` escapes the kernel uses for blanks and backslashes
fn unescape_octal(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..=i + 3].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let code = bytes[i + 1..=i + 3]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Ok(byte) = u8::try_from(code) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
