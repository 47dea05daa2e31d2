use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::env;
use crate::error::{McloneError, Result};
use crate::executor::rclone::TransferFlags;
use crate::executor::{ExecutorError, Rclone};
use crate::identity::IdentitySet;
use crate::session::locate;
use crate::task::{CredentialRegistry, Endpoint, Task, TaskChanges, TaskOptions};
use crate::volume::Volume;

/// Behaviour switches shared by every session operation
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Overwrite existing tasks, delete non-empty volumes, rewrite every manifest
    pub force: bool,
    /// Report without touching manifests or data
    pub simulate: bool,
    /// Ask Rclone for verbose output
    pub verbose: bool,
}

/// The set of volumes loaded for one run, and the tasks they replicate.
///
/// The session owns the only shared task collection. Volumes contribute their
/// manifests on restore and get back the subset that concerns them on commit.
pub struct Session {
    volumes: IdentitySet<Volume>,
    tasks: IdentitySet<Task>,
    credentials: CredentialRegistry,
    rclone: Rclone,
    options: SessionOptions,
}

impl Session {
    pub fn new(rclone: Rclone, options: SessionOptions) -> Self {
        Self {
            volumes: IdentitySet::new(),
            tasks: IdentitySet::new(),
            credentials: CredentialRegistry::new(),
            rclone,
            options,
        }
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn volumes(&self) -> &IdentitySet<Volume> {
        &self.volumes
    }

    pub fn tasks(&self) -> &IdentitySet<Task> {
        &self.tasks
    }

    pub fn credentials(&self) -> &CredentialRegistry {
        &self.credentials
    }

    /// Make `dir` a new volume, writing its empty manifest unless simulating.
    pub fn format_volume(&mut self, dir: &Path) -> Result<&Volume> {
        let file = env::volume_file_path(dir);
        if file.exists() && !self.options.force {
            return Err(McloneError::VolumeExists(file));
        }
        let mut volume = Volume::new(file)?;
        if !self.options.simulate {
            volume.commit(&self.tasks, &self.credentials, true)?;
        }
        info!("Formatted volume {} at {}", volume.id(), volume.root().display());
        let id = volume.id().to_string();
        self.volumes.insert(volume);
        self.volumes
            .get(&id)
            .ok_or(McloneError::VolumeNotLoaded(id))
    }

    /// Load the volume rooted at `dir` and merge its tasks into the session.
    ///
    /// Merging keeps the newest copy of every task. If the session had no
    /// pending changes, the merge is acknowledged as already persisted.
    pub fn restore_volume(&mut self, dir: &Path) -> Result<()> {
        let volume = Volume::restore(env::volume_file_path(dir))?;
        for task in volume.snapshot() {
            if let Some(token) = task.crypter().and_then(|c| c.token.as_deref()) {
                self.credentials.register(task.id(), token)?;
            }
        }
        let was_clean = !self.tasks.is_modified();
        self.tasks.merge(volume.snapshot().iter().cloned());
        if was_clean {
            self.tasks.commit();
        }
        debug!("Loaded volume {} from {}", volume.id(), volume.root().display());
        self.volumes.insert(volume);
        Ok(())
    }

    /// Load every volume found among `dirs`, skipping directories without a manifest
    pub fn restore_volumes<P: AsRef<Path>>(&mut self, dirs: impl IntoIterator<Item = P>) -> Result<()> {
        for dir in dirs {
            match self.restore_volume(dir.as_ref()) {
                Ok(()) => {}
                Err(McloneError::ManifestNotFound { path }) => {
                    debug!("No volume at {}", path.display());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Forget the volume matching `pattern` and remove its manifest.
    ///
    /// Refuses while the volume is referenced by a task, unless forced.
    pub fn delete_volume(&mut self, pattern: &str) -> Result<PathBuf> {
        let volume = self.volumes.resolve(pattern)?.clone();
        volume.ensure_deletable(&self.tasks, self.options.force)?;
        self.volumes.remove(&volume);
        let file = volume.file().to_path_buf();
        if self.options.simulate {
            info!("Would delete {}", file.display());
        } else {
            match std::fs::remove_file(&file) {
                Ok(()) => info!("Deleted volume {} at {}", volume.id(), file.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Volume {} was never written", volume.id());
                }
                Err(e) => return Err(McloneError::io(&file, e)),
            }
        }
        Ok(file)
    }

    /// Loaded volume containing `path`, and the path relative to its root
    pub fn locate(&self, path: &Path) -> Result<(&Volume, String)> {
        locate::locate(&self.volumes, path)
    }

    /// Define a task from `source` to `destination`; returns its identity.
    pub fn create_task(&mut self, source: &Path, destination: &Path, options: TaskOptions) -> Result<String> {
        let (source_volume, source_root) = self.locate(source)?;
        let source = Endpoint::new(source_volume.id(), source_root);
        let (destination_volume, destination_root) = self.locate(destination)?;
        let destination = Endpoint::new(destination_volume.id(), destination_root);

        let mut task = Task::new(source, destination, options)?;
        if let Some(existing) = self.tasks.get_equal(&task) {
            if !self.options.force {
                return Err(McloneError::TaskExists(existing.id().to_string()));
            }
            warn!("Replacing task {}", existing.id());
            task.mtime = task.mtime.max(existing.mtime + chrono::Duration::nanoseconds(1));
        }
        let id = task.id().to_string();
        info!("Created {} task {}", task.mode(), id);
        self.tasks.insert(task);
        Ok(id)
    }

    /// Apply `changes` to the task matching `pattern`; returns its identity.
    pub fn modify_task(&mut self, pattern: &str, changes: TaskChanges) -> Result<String> {
        let task = self.tasks.resolve(pattern)?.modified(changes);
        let id = task.id().to_string();
        self.tasks.insert(task);
        info!("Modified task {}", id);
        Ok(id)
    }

    /// Remove the task matching `pattern`; returns its identity.
    pub fn delete_task(&mut self, pattern: &str) -> Result<String> {
        let task = self.tasks.resolve(pattern)?.clone();
        self.tasks.remove(&task);
        info!("Deleted task {}", task.id());
        Ok(task.id().to_string())
    }

    /// Whether both volumes of `task` are loaded
    pub fn is_intact(&self, task: &Task) -> bool {
        self.volumes.get(&task.source().volume).is_some()
            && self.volumes.get(&task.destination().volume).is_some()
    }

    /// Tasks whose volumes are all loaded, in set order
    pub fn intact_tasks(&self) -> IdentitySet<Task> {
        self.tasks.filtered(|task| self.is_intact(task))
    }

    /// Persist every loaded volume that needs it.
    ///
    /// Crypt tokens missing for tasks whose credential holder is loaded are
    /// derived first, so each holder manifest can record its token. A holder
    /// whose token could not be derived is left as it is on disk. Every other
    /// volume is attempted even when one fails; the first error is returned.
    pub async fn commit(&mut self) -> Result<()> {
        if self.options.simulate {
            info!("Simulation: not writing volume files");
            return Ok(());
        }
        let mut first_error = None;
        let mut withheld = HashSet::new();
        for task in self.tasks.iter() {
            let Some(holder) = task.credential_holder() else {
                continue;
            };
            if self.volumes.get(holder).is_none() {
                continue;
            }
            if let Err(e) = self.credentials.resolve(task, &self.rclone).await {
                error!("Failed to derive crypt token for task {}: {}", task.id(), e);
                withheld.insert(holder.to_string());
                first_error.get_or_insert(e);
            }
        }

        let ids: Vec<String> = self.volumes.ids().map(str::to_string).collect();
        for id in ids {
            if withheld.contains(&id) {
                warn!("Not writing volume {}: a crypt token it holds is unknown", id);
                continue;
            }
            let Some(mut volume) = self.volumes.get(&id).cloned() else {
                continue;
            };
            match volume.commit(&self.tasks, &self.credentials, self.options.force) {
                Ok(_) => {
                    self.volumes.insert(volume);
                }
                Err(e) => {
                    error!("Failed to write volume {}: {}", id, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                self.tasks.commit();
                Ok(())
            }
        }
    }

    /// Run the intact task matching each of `patterns`, in the order given, or
    /// every intact task in set order when `patterns` is empty.
    ///
    /// A failing task does not stop the others; failures are reported together.
    pub async fn process_tasks(&mut self, patterns: &[String]) -> Result<()> {
        let intact = self.intact_tasks();
        let selected: Vec<Task> = if patterns.is_empty() {
            intact.iter().cloned().collect()
        } else {
            patterns
                .iter()
                .map(|pattern| intact.resolve(pattern).cloned())
                .collect::<Result<_>>()?
        };
        let stale = self.tasks.len() - intact.len();
        if stale > 0 && patterns.is_empty() {
            info!("Skipping {} stale task(s)", stale);
        }

        let flags = TransferFlags {
            dry_run: self.options.simulate,
            verbose: self.options.verbose,
        };
        let mut failed = Vec::new();
        for task in &selected {
            if let Err(e) = self.process_task(task, flags).await {
                error!("Task {} failed: {}", task.id(), e);
                failed.push(task.id().to_string());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(McloneError::TransferFailed(failed))
        }
    }

    async fn process_task(&mut self, task: &Task, flags: TransferFlags) -> Result<()> {
        let source = self.endpoint_path(task.source())?;
        let destination = self.endpoint_path(task.destination())?;
        let token = self.credentials.resolve(task, &self.rclone).await?;
        let cmd = self
            .rclone
            .transfer_command(task, &source, &destination, token.as_deref(), flags);
        let result = self.rclone.run(cmd).await?;
        if !result.success() {
            return Err(ExecutorError::ExecutionFailed {
                program: self.rclone.program().to_string(),
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn endpoint_path(&self, endpoint: &Endpoint) -> Result<PathBuf> {
        let volume = self
            .volumes
            .get(&endpoint.volume)
            .ok_or_else(|| McloneError::VolumeNotLoaded(endpoint.volume.clone()))?;
        Ok(if endpoint.root.is_empty() {
            volume.root().to_path_buf()
        } else {
            volume.root().join(&endpoint.root)
        })
    }
}
