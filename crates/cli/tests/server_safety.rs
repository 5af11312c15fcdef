use assert_cmd::prelude::*;
use std::process::Command;

#[test]
fn serve_http_refuses_non_loopback_without_public() {
    let dir = tempfile::tempdir().unwrap();
    Command::new(assert_cmd::cargo::cargo_bin!("tramites"))
        .current_dir(dir.path())
        .env("TRAMITES_EMBEDDING_MODE", "stub")
        .args(["serve-http", "--bind", "0.0.0.0:0"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Refusing to bind"));
}

#[test]
fn invalid_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.toml"), "[server]\nbind = 5000\n").unwrap();
    Command::new(assert_cmd::cargo::cargo_bin!("tramites"))
        .current_dir(dir.path())
        .env("TRAMITES_EMBEDDING_MODE", "stub")
        .args(["serve-http", "--config", "bad.toml"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Invalid config file"));
}
