use crate::env;
use crate::error::McloneError;
use crate::identity::IdentitySet;
use crate::task::*;
use crate::volume::*;
use std::fs;
use tempfile::TempDir;

fn create_volume(dir: &TempDir) -> Volume {
    Volume::new(env::volume_file_path(dir.path())).unwrap()
}

fn task_between(source: &str, destination: &str, root: &str) -> Task {
    Task::new(
        Endpoint::new(source, root),
        Endpoint::new(destination, root),
        TaskOptions::default(),
    )
    .unwrap()
}

/// Shared collection in its post-restore state: populated and acknowledged
fn clean_set(tasks: impl IntoIterator<Item = Task>) -> IdentitySet<Task> {
    let mut set: IdentitySet<Task> = tasks.into_iter().collect();
    set.commit();
    set
}

#[test]
fn test_new_volume_root_is_canonical_parent() {
    let dir = TempDir::new().unwrap();
    let volume = create_volume(&dir);

    assert_eq!(volume.root(), dir.path().canonicalize().unwrap());
    assert_eq!(volume.file(), dir.path().join(".mclone"));
    assert_eq!(volume.id().len(), 8);
    assert!(volume.snapshot().is_empty());
}

#[test]
fn test_relevant_tasks_filtering() {
    let dir = TempDir::new().unwrap();
    let volume = create_volume(&dir);
    let id = volume.id().to_string();

    let outgoing = task_between(&id, "other001", "a");
    let incoming = task_between("other001", &id, "b");
    let unrelated = task_between("other001", "other002", "c");
    let tasks = clean_set([outgoing.clone(), incoming.clone(), unrelated]);

    let relevant: Vec<&str> = volume.relevant_tasks(&tasks).map(|t| t.id()).collect();
    assert_eq!(relevant, vec![outgoing.id(), incoming.id()]);
}

#[test]
fn test_commit_writes_relevant_subset_then_reloads() {
    let dir = TempDir::new().unwrap();
    let mut volume = create_volume(&dir);
    let id = volume.id().to_string();
    let mine = task_between(&id, "other001", "a");
    let tasks: IdentitySet<Task> = [mine.clone(), task_between("x", "y", "z")].into_iter().collect();
    let credentials = CredentialRegistry::new();

    assert!(volume.commit(&tasks, &credentials, false).unwrap());

    let restored = Volume::restore(volume.file()).unwrap();
    assert_eq!(restored.id(), id);
    assert_eq!(restored.snapshot().len(), 1);
    let stored = restored.snapshot().get(mine.id()).unwrap();
    assert_eq!(stored.mtime(), mine.mtime());
    assert_eq!(stored, &mine);
}

#[test]
fn test_commit_skipped_when_unmodified() {
    let dir = TempDir::new().unwrap();
    let mut volume = create_volume(&dir);
    let credentials = CredentialRegistry::new();
    let tasks = clean_set([]);

    assert!(!volume.modified(&tasks, &credentials));
    assert!(!volume.commit(&tasks, &credentials, false).unwrap());
    assert!(!volume.file().exists());

    assert!(volume.commit(&tasks, &credentials, true).unwrap());
    assert!(volume.file().exists());
}

#[test]
fn test_modified_detects_addition_removal_and_edit() {
    let dir = TempDir::new().unwrap();
    let mut volume = create_volume(&dir);
    let id = volume.id().to_string();
    let credentials = CredentialRegistry::new();
    let task = task_between(&id, "other001", "a");

    let mut tasks = clean_set([task.clone()]);
    assert!(volume.modified(&tasks, &credentials), "addition not in snapshot");
    volume.commit(&tasks, &credentials, false).unwrap();
    tasks.commit();
    assert!(!volume.modified(&tasks, &credentials));

    // an edit replaces the member: same key, newer timestamp
    let mut edited = clean_set([task.modified(TaskChanges {
        mode: Some(Mode::Move),
        ..Default::default()
    })]);
    edited.commit();
    assert!(volume.modified(&edited, &credentials), "edit");

    // a removal after acknowledgement is still visible against the snapshot
    let mut removed = clean_set([task.clone()]);
    removed.remove(&task);
    removed.commit();
    assert!(removed.is_empty());
    assert!(volume.modified(&removed, &credentials), "removal");
}

#[test]
fn test_modified_ignores_unrelated_changes_once_acknowledged() {
    let dir = TempDir::new().unwrap();
    let volume = create_volume(&dir);
    let credentials = CredentialRegistry::new();

    let mut tasks = clean_set([task_between("x", "y", "z")]);
    assert!(!volume.modified(&tasks, &credentials));

    tasks.insert(task_between("x", "y", "w"));
    assert!(volume.modified(&tasks, &credentials), "dirty shared set counts");
    tasks.commit();
    assert!(!volume.modified(&tasks, &credentials));
}

#[test]
fn test_stale_replica_is_rewritten() {
    let dir = TempDir::new().unwrap();
    let mut volume = create_volume(&dir);
    let id = volume.id().to_string();
    let credentials = CredentialRegistry::new();
    let old = task_between(&id, "other001", "a");
    volume.commit(&clean_set([old.clone()]), &credentials, false).unwrap();

    // a newer copy of the same task arrived from another volume's manifest
    let newer = old.modified(TaskChanges {
        exclude: Some("*.tmp".to_string()),
        ..Default::default()
    });
    let tasks = clean_set([newer]);
    assert!(volume.modified(&tasks, &credentials));
    assert!(volume.commit(&tasks, &credentials, false).unwrap());

    let restored = Volume::restore(volume.file()).unwrap();
    assert_eq!(restored.snapshot().get(old.id()).unwrap().exclude(), Some("*.tmp"));
}

#[test]
fn test_manifest_partitions_token() {
    let source_dir = TempDir::new().unwrap();
    let destination_dir = TempDir::new().unwrap();
    let mut source = create_volume(&source_dir);
    let mut destination = create_volume(&destination_dir);
    let task = Task::new(
        Endpoint::new(source.id(), ""),
        Endpoint::new(destination.id(), ""),
        TaskOptions {
            crypter_mode: Some(CrypterMode::Encrypt),
            token: Some("secret-token".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    let tasks: IdentitySet<Task> = [task].into_iter().collect();
    let credentials = CredentialRegistry::new();

    source.commit(&tasks, &credentials, false).unwrap();
    destination.commit(&tasks, &credentials, false).unwrap();

    let on_source = fs::read_to_string(source.file()).unwrap();
    let on_destination = fs::read_to_string(destination.file()).unwrap();
    assert!(on_source.contains("secret-token"));
    assert!(!on_destination.contains("secret-token"));
    assert!(on_destination.contains("\"encrypt\""));
}

#[test]
fn test_holder_rewritten_when_token_becomes_known() {
    let source_dir = TempDir::new().unwrap();
    let mut source = create_volume(&source_dir);
    let task = Task::new(
        Endpoint::new(source.id(), ""),
        Endpoint::new("other001", ""),
        TaskOptions {
            crypter_mode: Some(CrypterMode::Encrypt),
            ..Default::default()
        },
    )
    .unwrap();
    let tasks = clean_set([task.clone()]);
    let mut credentials = CredentialRegistry::new();

    assert!(source.commit(&tasks, &credentials, false).unwrap());
    assert!(!source.modified(&tasks, &credentials));

    credentials.register(task.id(), "derived-token").unwrap();
    assert!(source.modified(&tasks, &credentials));
    assert!(source.commit(&tasks, &credentials, false).unwrap());
    assert!(!source.modified(&tasks, &credentials));
    assert!(fs::read_to_string(source.file()).unwrap().contains("derived-token"));
}

#[test]
fn test_ensure_deletable() {
    let dir = TempDir::new().unwrap();
    let volume = create_volume(&dir);
    let tasks = clean_set([task_between(volume.id(), "other001", "")]);

    assert!(matches!(
        volume.ensure_deletable(&tasks, false),
        Err(McloneError::VolumeNotEmpty(_))
    ));
    assert!(volume.ensure_deletable(&tasks, true).is_ok());
    assert!(volume.ensure_deletable(&clean_set([]), false).is_ok());
}

#[test]
fn test_restore_rejects_unknown_mode() {
    let dir = TempDir::new().unwrap();
    let path = env::volume_file_path(dir.path());
    fs::write(
        &path,
        r#"{"mclone": 0, "volume": "abcd1234", "tasks": [
            {"task": "t1", "mode": "mirror", "mtime": "2023-01-01T00:00:00Z",
             "source": {"volume": "abcd1234"}, "destination": {"volume": "x"}}
        ]}"#,
    )
    .unwrap();

    assert!(matches!(
        Volume::restore(&path),
        Err(McloneError::UnknownMode(_))
    ));
}
