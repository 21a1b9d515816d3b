//! Black-box smoke tests over the binaries.

use assert_cmd::Command;

#[test]
fn masc_help_lists_the_command_surface() {
    let output = Command::cargo_bin("masc")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();
    for needle in ["join", "task", "broadcast", "lock", "walph", "swarm"] {
        assert!(stdout.contains(needle), "help missing {needle}");
    }
}

#[test]
fn mascd_version_prints_and_exits_zero() {
    let output = Command::cargo_bin("mascd")
        .unwrap()
        .arg("--version")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();
    assert!(stdout.starts_with("mascd "), "stdout: {stdout}");
}

#[test]
fn masc_without_a_daemon_fails_with_a_hint() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("masc")
        .unwrap()
        .args(["--room", dir.path().to_str().unwrap(), "status"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&output.get_output().stderr).into_owned();
    assert!(stderr.contains("mascd"), "stderr: {stderr}");
}
