use crate::error::McloneError;
use crate::identity::IdentitySet;
use crate::task::*;
use chrono::{Duration, TimeZone, Utc};

fn endpoint(volume: &str, root: &str) -> Endpoint {
    Endpoint::new(volume, root)
}

fn create_test_task() -> Task {
    Task::new(
        endpoint("aaaa0001", "photos"),
        endpoint("bbbb0002", "backup/photos"),
        TaskOptions::default(),
    )
    .unwrap()
}

fn crypt_task(mode: CrypterMode) -> Task {
    Task::new(
        endpoint("aaaa0001", ""),
        endpoint("bbbb0002", "vault"),
        TaskOptions {
            crypter_mode: Some(mode),
            token: Some("obscured-token".to_string()),
            ..Default::default()
        },
    )
    .unwrap()
}

fn record_json(mtime: &str, mode: &str) -> TaskRecord {
    serde_json::from_value(serde_json::json!({
        "task": "cafe0001",
        "mode": mode,
        "mtime": mtime,
        "source": {"volume": "aaaa0001", "root": "docs"},
        "destination": {"volume": "bbbb0002"},
        "include": "*.pdf",
        "exclude": ""
    }))
    .unwrap()
}

#[test]
fn test_task_creation_defaults() {
    let task = create_test_task();

    assert_eq!(task.id().len(), 8);
    assert_eq!(task.mode(), Mode::Update);
    assert_eq!(task.include(), None);
    assert_eq!(task.exclude(), None);
    assert_eq!(task.crypter_mode(), None);
    assert!(task.references("aaaa0001"));
    assert!(task.references("bbbb0002"));
    assert!(!task.references("cccc0003"));
}

#[test]
fn test_equality_is_independent_of_identity() {
    let a = create_test_task();
    let b = create_test_task();
    assert_ne!(a.id(), b.id());
    assert_eq!(a, b);

    let other_root = Task::new(
        endpoint("aaaa0001", "photos"),
        endpoint("bbbb0002", "elsewhere"),
        TaskOptions::default(),
    )
    .unwrap();
    assert_ne!(a, other_root);

    let reversed = Task::new(
        endpoint("bbbb0002", "backup/photos"),
        endpoint("aaaa0001", "photos"),
        TaskOptions::default(),
    )
    .unwrap();
    assert_ne!(a, reversed);
}

#[test]
fn test_empty_filters_normalize_to_unset() {
    let task = Task::new(
        endpoint("aaaa0001", ""),
        endpoint("bbbb0002", ""),
        TaskOptions {
            include: Some(String::new()),
            exclude: Some("*.tmp".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(task.include(), None);
    assert_eq!(task.exclude(), Some("*.tmp"));
}

#[test]
fn test_password_and_token_together_rejected() {
    let result = Task::new(
        endpoint("aaaa0001", ""),
        endpoint("bbbb0002", ""),
        TaskOptions {
            crypter_mode: Some(CrypterMode::Encrypt),
            password: Some("secret".to_string()),
            token: Some("token".to_string()),
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(McloneError::ConflictingCredentialInput)));
}

#[test]
fn test_modified_copy_keeps_identity_and_advances_mtime() {
    let original = create_test_task();
    let changed = original.modified(TaskChanges {
        mode: Some(Mode::Synchronize),
        include: Some("*.jpg".to_string()),
        exclude: None,
    });

    assert_eq!(changed.id(), original.id());
    assert_eq!(changed, original);
    assert!(changed.mtime() > original.mtime());
    assert_eq!(changed.mode(), Mode::Synchronize);
    assert_eq!(changed.include(), Some("*.jpg"));
    // the source value is untouched
    assert_eq!(original.mode(), Mode::Update);
    assert_eq!(original.include(), None);

    let cleared = changed.modified(TaskChanges {
        include: Some(String::new()),
        ..Default::default()
    });
    assert_eq!(cleared.include(), None);
    assert_eq!(cleared.mode(), Mode::Synchronize);
}

#[test]
fn test_restore_preserves_identity_and_timestamp() {
    let task = Task::restore(record_json("2023-05-01T10:20:30.123456Z", "copy")).unwrap();

    assert_eq!(task.id(), "cafe0001");
    assert_eq!(task.mode(), Mode::Copy);
    assert_eq!(task.source().root, "docs");
    assert_eq!(task.destination().root, "");
    assert_eq!(task.include(), Some("*.pdf"));
    assert_eq!(task.exclude(), None);
    assert_eq!(
        task.mtime(),
        Utc.with_ymd_and_hms(2023, 5, 1, 10, 20, 30).unwrap() + Duration::microseconds(123456)
    );
}

#[test]
fn test_restore_unparseable_timestamp_falls_back_to_now() {
    let before = Utc::now();
    let task = Task::restore(record_json("yesterday-ish", "update")).unwrap();
    assert!(task.mtime() >= before);
}

#[test]
fn test_restore_unknown_mode_fails() {
    let err = Task::restore(record_json("2023-05-01T10:20:30Z", "mirror")).unwrap_err();
    assert!(matches!(err, McloneError::UnknownMode(ref m) if m == "mirror"));
}

#[test]
fn test_record_round_trip_keeps_fields() {
    let registry = CredentialRegistry::new();
    let task = create_test_task().modified(TaskChanges {
        exclude: Some("*.bak".to_string()),
        ..Default::default()
    });
    let restored = Task::restore(task.to_record("aaaa0001", &registry)).unwrap();

    assert_eq!(restored.id(), task.id());
    assert_eq!(restored.mtime(), task.mtime());
    assert_eq!(restored.exclude(), Some("*.bak"));
    assert_eq!(restored, task);
}

#[test]
fn test_empty_root_omitted_from_record() {
    let registry = CredentialRegistry::new();
    let task = crypt_task(CrypterMode::Encrypt);
    let json = serde_json::to_value(task.to_record("aaaa0001", &registry)).unwrap();

    assert!(json["source"].get("root").is_none());
    assert_eq!(json["destination"]["root"], "vault");
    assert!(json.get("include").is_none());
}

#[test]
fn test_token_persisted_only_on_holder() {
    let registry = CredentialRegistry::new();

    let encrypt = crypt_task(CrypterMode::Encrypt);
    let on_source = encrypt.to_record("aaaa0001", &registry).crypter.unwrap();
    let on_destination = encrypt.to_record("bbbb0002", &registry).crypter.unwrap();
    assert_eq!(on_source.mode, "encrypt");
    assert_eq!(on_source.token.as_deref(), Some("obscured-token"));
    assert_eq!(on_destination.mode, "encrypt");
    assert_eq!(on_destination.token, None);

    let decrypt = crypt_task(CrypterMode::Decrypt);
    assert_eq!(decrypt.to_record("aaaa0001", &registry).crypter.unwrap().token, None);
    assert_eq!(
        decrypt
            .to_record("bbbb0002", &registry)
            .crypter
            .unwrap()
            .token
            .as_deref(),
        Some("obscured-token")
    );
}

#[test]
fn test_token_from_registry_used_on_holder() {
    let mut registry = CredentialRegistry::new();
    let record: TaskRecord = serde_json::from_value(serde_json::json!({
        "task": "beef0001",
        "mode": "update",
        "mtime": "2023-05-01T10:20:30Z",
        "source": {"volume": "aaaa0001"},
        "destination": {"volume": "bbbb0002"},
        "crypter": {"mode": "encrypt"}
    }))
    .unwrap();
    let task = Task::restore(record).unwrap();
    assert_eq!(task.to_record("aaaa0001", &registry).crypter.unwrap().token, None);

    registry.register("beef0001", "from-registry").unwrap();
    assert_eq!(
        task.to_record("aaaa0001", &registry).crypter.unwrap().token.as_deref(),
        Some("from-registry")
    );
    assert_eq!(task.to_record("bbbb0002", &registry).crypter.unwrap().token, None);
}

#[test]
fn test_task_set_last_write_wins() {
    let mut tasks = IdentitySet::new();
    let newer = create_test_task();
    let mut older = create_test_task();
    older.mtime = newer.mtime() - Duration::seconds(10);
    let mut same_time = create_test_task();
    same_time.mtime = newer.mtime();

    assert!(tasks.insert(newer.clone()));
    assert!(!tasks.insert(older.clone()));
    assert!(!tasks.insert(same_time));
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks.get_equal(&older).unwrap().id(), newer.id());

    let replacement = newer.modified(TaskChanges::default());
    let mut fresh = create_test_task();
    fresh.mtime = replacement.mtime() + Duration::seconds(1);
    assert!(tasks.insert(fresh.clone()));
    assert_eq!(tasks.len(), 1);
    assert!(tasks.get(newer.id()).is_none());
    assert_eq!(tasks.get_equal(&newer).unwrap().id(), fresh.id());
}

#[test]
fn test_mode_resolution() {
    assert_eq!(Mode::resolve("sy").unwrap(), Mode::Synchronize);
    assert_eq!(Mode::resolve("^u").unwrap(), Mode::Update);
    assert_eq!(Mode::resolve("move").unwrap(), Mode::Move);
    assert!(matches!(Mode::resolve("o"), Err(McloneError::Ambiguous { .. })));
    assert!(matches!(Mode::resolve("zip"), Err(McloneError::NoMatch { .. })));
    assert_eq!(CrypterMode::resolve("en").unwrap(), CrypterMode::Encrypt);
    assert!(matches!(
        "scramble".parse::<CrypterMode>(),
        Err(McloneError::UnknownCrypterMode(_))
    ));
}

#[test]
fn test_crypter_debug_redacts_secrets() {
    let mut crypter = Crypter::new(CrypterMode::Encrypt);
    crypter.token = Some("obscured-token".to_string());
    crypter.password = Some("hunter2".to_string());

    let printed = format!("{crypter:?}");
    assert!(!printed.contains("obscured-token"));
    assert!(!printed.contains("hunter2"));
    assert!(printed.contains("Encrypt"));
}
