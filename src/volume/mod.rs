//! Volumes: storage locations replicating the task definitions that concern them.
//!
//! A volume is a directory with a `.mclone` manifest at its root. The manifest
//! holds exactly the tasks, among those known to the session, that reference the
//! volume as source or destination. The volume itself keeps no copy of the
//! session's tasks: its view is a predicate over the shared collection,
//! recomputed on demand.

pub mod manifest;

#[cfg(test)]
mod tests;

pub use manifest::*;

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{McloneError, Result};
use crate::identity::{IdentitySet, Identified};
use crate::task::{CredentialRegistry, Task, new_id};

#[derive(Debug, Clone)]
pub struct Volume {
    id: String,
    file: PathBuf,
    root: PathBuf,
    /// Relevant tasks as last read from or written to the manifest
    snapshot: IdentitySet<Task>,
}

impl Volume {
    /// Brand new volume whose manifest will live at `file`
    pub fn new(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let root = canonical_root(&file)?;
        Ok(Self {
            id: new_id(),
            file,
            root,
            snapshot: IdentitySet::new(),
        })
    }

    /// Load the volume whose manifest is `file`.
    ///
    /// The parsed tasks are available through [`Volume::snapshot`] for the session
    /// to merge into its shared collection.
    pub fn restore(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let manifest = Manifest::load(&file)?;
        let root = canonical_root(&file)?;
        let id = manifest.volume.clone();
        let snapshot = snapshot_of(manifest)?;
        debug!(
            "Restored volume {} from {} with {} task(s)",
            id,
            file.display(),
            snapshot.len()
        );
        Ok(Self {
            id,
            file,
            root,
            snapshot,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Manifest file path
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Canonical directory holding the manifest
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Tasks as last persisted on this volume
    pub fn snapshot(&self) -> &IdentitySet<Task> {
        &self.snapshot
    }

    /// Tasks of `tasks` referencing this volume as source or destination
    pub fn relevant_tasks<'a>(&'a self, tasks: &'a IdentitySet<Task>) -> impl Iterator<Item = &'a Task> + 'a {
        tasks.iter().filter(|task| task.references(&self.id))
    }

    /// Whether the manifest no longer reflects `tasks`.
    ///
    /// Compares the relevant view with the snapshot: membership (catching
    /// additions and removals), then each member's identity and timestamp
    /// (catching edits and stale replicas) and, where this volume holds the
    /// credential, the stored token. A dirty shared set counts as a change.
    pub fn modified(&self, tasks: &IdentitySet<Task>, credentials: &CredentialRegistry) -> bool {
        if tasks.is_modified() {
            return true;
        }
        let view = tasks.filtered(|task| task.references(&self.id));
        view != self.snapshot
            || view.iter().any(|task| match self.snapshot.get_equal(task) {
                Some(stored) => {
                    stored.id() != task.id()
                        || stored.mtime() != task.mtime()
                        || (task.credential_holder() == Some(self.id.as_str())
                            && credentials.known(task) != stored.crypter().and_then(|c| c.token.as_deref()))
                }
                None => true,
            })
    }

    /// Manifest for this volume, tokens included only where it holds them
    pub fn to_manifest(&self, tasks: &IdentitySet<Task>, credentials: &CredentialRegistry) -> Manifest {
        Manifest::new(
            self.id.clone(),
            self.relevant_tasks(tasks)
                .map(|task| task.to_record(&self.id, credentials))
                .collect(),
        )
    }

    /// Persist the manifest if `force`d or [`modified`](Self::modified).
    ///
    /// Returns whether the file was written.
    pub fn commit(
        &mut self,
        tasks: &IdentitySet<Task>,
        credentials: &CredentialRegistry,
        force: bool,
    ) -> Result<bool> {
        if !force && !self.modified(tasks, credentials) {
            debug!("Volume {} is up to date", self.id);
            return Ok(false);
        }
        let manifest = self.to_manifest(tasks, credentials);
        let bytes = manifest.store(&self.file)?;
        info!(
            "Wrote volume {} to {} ({} task(s), {} bytes)",
            self.id,
            self.file.display(),
            manifest.tasks.len(),
            bytes
        );
        self.snapshot = snapshot_of(manifest)?;
        Ok(true)
    }

    /// Refuse deletion while the volume still owns a task, unless `force`d
    pub fn ensure_deletable(&self, tasks: &IdentitySet<Task>, force: bool) -> Result<()> {
        if !force && self.relevant_tasks(tasks).next().is_some() {
            return Err(McloneError::VolumeNotEmpty(self.file.clone()));
        }
        Ok(())
    }
}

impl Identified for Volume {
    type Key = String;
    const KIND: &'static str = "volume";

    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// Tasks exactly as recorded in `manifest`
fn snapshot_of(manifest: Manifest) -> Result<IdentitySet<Task>> {
    let mut snapshot = IdentitySet::new();
    for record in manifest.tasks {
        snapshot.insert(Task::restore(record)?);
    }
    snapshot.commit();
    Ok(snapshot)
}

fn canonical_root(file: &Path) -> Result<PathBuf> {
    let dir = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    dir.canonicalize().map_err(|e| McloneError::io(dir, e))
}
