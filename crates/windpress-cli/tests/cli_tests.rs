//! End-to-end tests of the `windpress` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn windpress(cwd: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("windpress").unwrap();
    cmd.current_dir(cwd.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("WINDPRESS_CONFIG")
        .env_remove("WINDPRESS_SITE_URL");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    windpress(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("compile"))
        .stdout(predicate::str::contains("volume"));
}

#[test]
fn test_volume_backup_round_trip() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("volume");
    fs::create_dir_all(src.join("plugins")).unwrap();
    fs::write(src.join("main.css"), "@import \"tailwindcss\";\n@plugin \"./plugins/forms.js\";").unwrap();
    fs::write(src.join("plugins/forms.js"), "export default function () {}").unwrap();

    windpress(&temp)
        .args(["volume", "export", "volume", "-o", "site.windpress"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Exported 2 files"));

    windpress(&temp)
        .args(["volume", "import", "site.windpress", "-o", "restored"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Imported 2 files"));

    assert_eq!(
        fs::read_to_string(temp.path().join("restored/main.css")).unwrap(),
        "@import \"tailwindcss\";\n@plugin \"./plugins/forms.js\";"
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("restored/plugins/forms.js")).unwrap(),
        "export default function () {}"
    );
}

#[test]
fn test_volume_import_rejects_garbage() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("broken.windpress"), "definitely not a backup").unwrap();

    windpress(&temp)
        .args(["volume", "import", "broken.windpress", "-o", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Volume error"));
}

#[test]
fn test_build_requires_site_url() {
    let temp = TempDir::new().unwrap();

    windpress(&temp)
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("siteUrl"));
}

#[test]
fn test_explicit_config_must_exist() {
    let temp = TempDir::new().unwrap();

    windpress(&temp)
        .args(["--config", "missing.json", "build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_build_rejects_invalid_provider_id() {
    let temp = TempDir::new().unwrap();

    windpress(&temp)
        .args(["build", "--incremental", "--provider", "Not Valid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Provider id"));
}
