// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = RoomConfig::load(dir.path());
    assert_eq!(config.backend, BackendKind::File);
    assert_eq!(config.cleanup_interval_secs, 60);
    assert_eq!(config.zombie_threshold_secs, 300);
    assert!(!config.auth_enabled);
}

#[test]
fn partial_config_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let masc = dir.path().join(".masc");
    std::fs::create_dir_all(&masc).unwrap();
    std::fs::write(
        masc.join("config.toml"),
        "backend = \"memory\"\nzombie_threshold_secs = 30\n",
    )
    .unwrap();

    let config = RoomConfig::load(dir.path());
    assert_eq!(config.backend, BackendKind::Memory);
    assert_eq!(config.zombie_threshold_secs, 30);
    assert_eq!(config.cleanup_interval_secs, 60);
}

#[test]
fn malformed_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let masc = dir.path().join(".masc");
    std::fs::create_dir_all(&masc).unwrap();
    std::fs::write(masc.join("config.toml"), "not valid {{{").unwrap();

    let config = RoomConfig::load(dir.path());
    assert_eq!(config.backend, BackendKind::File);
}

#[test]
fn project_name_defaults_to_dirname() {
    let dir = tempfile::tempdir().unwrap();
    let config = RoomConfig::default();
    let expected = dir.path().file_name().unwrap().to_str().unwrap();
    assert_eq!(config.project_name_or(dir.path()), expected);

    let named = RoomConfig {
        project_name: Some("orchestra".into()),
        ..RoomConfig::default()
    };
    assert_eq!(named.project_name_or(dir.path()), "orchestra");
}
