//! Integration tests for CLI functionality
//!
//! These tests verify that the different CLI components work together properly.
//! Unit tests for individual functions are located in the respective module files.

use clap::Parser;
use mclone::cli::{Args, Commands, ConfigDiscovery, McloneConfig, TaskCommand, VolumeCommand};
use mclone::mounts;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_command_tree() {
    let parse = |args: &[&str]| {
        Args::try_parse_from(std::iter::once("mclone").chain(args.iter().copied())).unwrap()
    };

    assert!(matches!(parse(&["info"]).command, Some(Commands::Info)));
    assert!(matches!(
        parse(&["volume", "create", "/mnt/usb"]).command,
        Some(Commands::Volume(VolumeCommand::New { .. }))
    ));
    assert!(matches!(
        parse(&["task", "process"]).command,
        Some(Commands::Task(TaskCommand::Process { ref tasks })) if tasks.is_empty()
    ));
    assert!(matches!(
        parse(&["-v", "task", "delete", "ab"]).command,
        Some(Commands::Task(TaskCommand::Delete { .. }))
    ));
    assert!(Args::try_parse_from(["mclone", "--version"]).is_err());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("custom.toml");
    fs::write(
        &config_path,
        "rclone = \"/usr/local/bin/rclone\"\nscan_system_mounts = false\nsearch_paths = [\"/srv/backup\"]\n",
    )
    .unwrap();
    let extra = temp_dir.path().join("extra");
    let list = env::join_paths([&extra]).unwrap();

    // SAFETY: serialized with every other test touching the environment
    unsafe {
        env::set_var("RCLONE", "rclone-next");
        env::set_var("MCLONE_PATH", &list);
    }
    let config = McloneConfig::from_toml_file(&config_path).unwrap().apply_env();
    unsafe {
        env::remove_var("RCLONE");
        env::remove_var("MCLONE_PATH");
    }

    assert_eq!(config.rclone, "rclone-next");
    assert!(!config.scan_system_mounts);
    assert_eq!(config.search_paths, vec![extra, PathBuf::from("/srv/backup")]);
}

#[test]
#[serial]
fn test_discovery_prefers_current_directory() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join(".mclone.d")).unwrap();
    fs::write(
        temp_dir.path().join(".mclone.d").join("config.toml"),
        "rclone = \"from-dot-dir\"\n",
    )
    .unwrap();
    let previous = env::current_dir().unwrap();
    env::set_current_dir(temp_dir.path()).unwrap();

    let found = ConfigDiscovery::find_config_file();
    let config = ConfigDiscovery::discover_config();

    fs::write(temp_dir.path().join("mclone.toml"), "rclone = \"from-file\"\n").unwrap();
    let preferred = ConfigDiscovery::discover_config();
    env::set_current_dir(previous).unwrap();

    assert!(found.unwrap().ends_with(".mclone.d/config.toml"));
    assert_eq!(config.unwrap().rclone, "from-dot-dir");
    assert_eq!(preferred.unwrap().rclone, "from-file");
}

#[test]
fn test_search_paths_become_candidates() {
    let temp_dir = TempDir::new().unwrap();
    let usb = temp_dir.path().join("usb");
    fs::create_dir_all(&usb).unwrap();
    let file = temp_dir.path().join("not-a-dir");
    fs::write(&file, "").unwrap();

    let config = McloneConfig {
        search_paths: vec![usb.clone(), file],
        scan_system_mounts: false,
        ..Default::default()
    };
    assert_eq!(mounts::candidate_dirs(&config), vec![usb]);
}
