//! Integration tests for the qheal binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Command isolated from any user config
fn qheal_cmd(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("qheal").unwrap();
    cmd.env("QHEAL_CONFIG", config_dir.path().join("config.json"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_bare_query_is_sanitized() {
    let dir = TempDir::new().unwrap();
    qheal_cmd(&dir)
        .args(["a", "AND", "AND", "b"])
        .assert()
        .success()
        .stdout("a AND b\n");
}

#[test]
fn test_no_query_fails() {
    let dir = TempDir::new().unwrap();
    qheal_cmd(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no query given"));
}

#[test]
fn test_sanitize_shows_rewrite() {
    let dir = TempDir::new().unwrap();
    qheal_cmd(&dir)
        .args(["sanitize", "--check", "(a (b) c"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(a (b) c -> (a (b) c)"))
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn test_tokens_json() {
    let dir = TempDir::new().unwrap();
    let output = qheal_cmd(&dir)
        .args(["tokens", "--json", "a \"b"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let captures: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let captures = captures.as_array().unwrap();
    assert_eq!(captures.len(), 5);
    assert_eq!(captures[0]["kind"], "operand");
    assert_eq!(captures[4]["synthetic"], true);
}

#[test]
fn test_tree() {
    let dir = TempDir::new().unwrap();
    qheal_cmd(&dir)
        .args(["tree", "a OR b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("root \"a OR b\""))
        .stdout(predicate::str::contains("operand \"b\""));
}

#[test]
fn test_check_rejects_invalid() {
    let dir = TempDir::new().unwrap();
    qheal_cmd(&dir)
        .args(["check", "a AND"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid"));

    qheal_cmd(&dir)
        .args(["check", "a AND b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(AND a b)"));
}

#[test]
fn test_build_languages() {
    let dir = TempDir::new().unwrap();
    qheal_cmd(&dir)
        .args(["build", "--language", "simple", "c++ rust rust"])
        .assert()
        .success()
        .stdout("c\\+\\+ AND rust\n");

    qheal_cmd(&dir)
        .args(["build", "--language", "full", "a AND"])
        .assert()
        .failure();

    qheal_cmd(&dir)
        .args(["build", "--language", "lucene", "a"])
        .assert()
        .failure();
}

#[test]
fn test_batch_json_lines() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("queries.txt");
    fs::write(&input, "a AND\n\n(b\n+\n").unwrap();

    let output = qheal_cmd(&dir)
        .args(["batch", "--json", "--quiet"])
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["sanitized"], "a");
    assert_eq!(lines[1]["sanitized"], "(b)");
    assert_eq!(lines[2]["sanitized"], "*");
}

#[test]
fn test_batch_missing_file() {
    let dir = TempDir::new().unwrap();
    qheal_cmd(&dir)
        .args(["batch", "--quiet"])
        .arg(dir.path().join("missing.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_config_init_and_limits() {
    let dir = TempDir::new().unwrap();
    qheal_cmd(&dir)
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote config"));

    let path = dir.path().join("config.json");
    let mut config: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(config["max_captures"], 256);

    config["max_captures"] = 2.into();
    fs::write(&path, config.to_string()).unwrap();

    qheal_cmd(&dir)
        .args(["a", "b", "c"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("too complex"));

    qheal_cmd(&dir)
        .args(["--max-captures", "64", "a", "b", "c"])
        .assert()
        .success()
        .stdout("a b c\n");
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.json"), r#"{"max_iterations": 0}"#).unwrap();

    qheal_cmd(&dir)
        .arg("a")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
