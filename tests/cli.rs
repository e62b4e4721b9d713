use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn macbundler(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("macbundler").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env("MACBUNDLER_NO_PROGRESS", "1")
        .env_remove("DEV_ID")
        .env_remove("KEYCHAIN_PROFILE");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    macbundler(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("create")
                .and(predicate::str::contains("fix"))
                .and(predicate::str::contains("sign"))
                .and(predicate::str::contains("package")),
        );
}

#[test]
fn create_with_missing_executable_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    macbundler(&dir)
        .args(["create", "does-not-exist"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Executable not found"));
}

#[test]
fn fix_requires_destination() {
    let dir = tempfile::tempdir().unwrap();
    macbundler(&dir)
        .args(["fix", "main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dest"));
}

#[test]
fn fix_with_missing_file_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    macbundler(&dir)
        .args(["fix", "missing-binary", "-d", "libs", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn sign_missing_bundle_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    macbundler(&dir)
        .args(["sign", "Nope.app", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Bundle not found"));
}

#[test]
fn package_missing_source_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    macbundler(&dir)
        .args(["package", "Nope.app", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Source not found"));
}

#[test]
fn invalid_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".macbundler.toml"), "[unknown]\nkey = 1\n").unwrap();
    macbundler(&dir)
        .args(["sign", "Nope.app"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn dry_run_create_builds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join("tool");
    std::fs::write(&exe, b"\xcf\xfa\xed\xfe\x07\x00\x00\x01").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    macbundler(&dir)
        .args(["create", "tool", "--dry-run", "--non-interactive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tool.app"));
    assert!(!dir.path().join("tool.app").exists());
}
