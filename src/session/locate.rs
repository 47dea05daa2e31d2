//! Mapping filesystem paths onto loaded volumes.

use std::path::{Component, Path, PathBuf};

use crate::error::{McloneError, Result};
use crate::volume::Volume;

/// Absolute, symlink-free form of `path`.
///
/// The path need not exist: the longest existing ancestor is canonicalized and
/// the remaining components are appended lexically.
pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| McloneError::io(path, e))?
            .join(path)
    };

    let mut existing = absolute;
    let mut tail = Vec::new();
    let mut resolved = loop {
        match existing.canonicalize() {
            Ok(resolved) => break resolved,
            Err(e) => {
                let last = existing
                    .components()
                    .next_back()
                    .map(|c| c.as_os_str().to_os_string());
                match last {
                    Some(name) if existing.pop() => tail.push(name),
                    _ => return Err(McloneError::io(path, e)),
                }
            }
        }
    };
    for name in tail.into_iter().rev() {
        match Path::new(&name).components().next() {
            Some(Component::ParentDir) => {
                resolved.pop();
            }
            Some(Component::CurDir) | None => {}
            _ => resolved.push(name),
        }
    }
    Ok(resolved)
}

/// Path of `path` relative to `root` as a `/`-separated string, if `root` is a
/// path-boundary prefix of it.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let mut components = path.components();
    for expected in root.components() {
        let actual = components.next()?;
        if !same_component(expected, actual) {
            return None;
        }
    }
    let rest: Vec<String> = components
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(rest.join("/"))
}

#[cfg(windows)]
fn same_component(a: Component<'_>, b: Component<'_>) -> bool {
    a.as_os_str().to_string_lossy().to_lowercase() == b.as_os_str().to_string_lossy().to_lowercase()
}

#[cfg(not(windows))]
fn same_component(a: Component<'_>, b: Component<'_>) -> bool {
    a == b
}

/// Volume with the longest root containing `path`, along with the relative path
/// inside it.
pub fn locate<'a>(
    volumes: impl IntoIterator<Item = &'a Volume>,
    path: &Path,
) -> Result<(&'a Volume, String)> {
    let target = resolve_path(path)?;
    volumes
        .into_iter()
        .filter_map(|volume| relative_path(volume.root(), &target).map(|rel| (volume, rel)))
        .max_by_key(|(volume, _)| volume.root().components().count())
        .ok_or(McloneError::OutsideVolume { path: target })
}
