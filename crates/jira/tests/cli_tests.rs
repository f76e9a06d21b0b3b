//! End-to-end tests for the `jira` binary.
//!
//! Nothing here reaches a real Jira server: the tests cover argument
//! handling, configuration discovery, template export and exit codes.

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A port nothing listens on, so connections are refused immediately.
const DEAD_ENDPOINT: &str = "http://127.0.0.1:1";

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
        }
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    fn jira_home(&self) -> PathBuf {
        self.root().join(".jira.d")
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// The binary, isolated from the caller's environment and config.
    fn jira(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("jira"));
        cmd.current_dir(self.root())
            .env("JIRA_HOME", self.jira_home())
            .env("JIRA_USER", "alice")
            .env("JIRA_PASSWORD", "secret")
            .env_remove("JIRA_ENDPOINT")
            .env_remove("JIRA_TEMPLATE")
            .env_remove("JIRA_PROJECT")
            .env_remove("JIRA_DEBUG")
            .env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_help_lists_commands() {
    let ctx = TestContext::new();
    ctx.jira()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Command-line client for Jira"))
        .stdout(predicate::str::contains("transition"))
        .stdout(predicate::str::contains("export-templates"));
}

#[test]
fn test_missing_endpoint_is_invalid_argument() {
    let ctx = TestContext::new();
    ctx.jira()
        .args(["view", "ABC-1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No Jira endpoint configured"))
        .stderr(predicate::str::contains("To fix:"));
}

#[test]
fn test_bare_issue_key_runs_view() {
    let ctx = TestContext::new();
    // Reaches the endpoint check, so clap accepted the rewritten arguments.
    ctx.jira()
        .arg("ABC-1")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No Jira endpoint configured"));
}

#[test]
fn test_unknown_word_is_not_rewritten() {
    let ctx = TestContext::new();
    ctx.jira()
        .arg("frobnicate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_malformed_override_rejected() {
    let ctx = TestContext::new();
    ctx.jira()
        .args(["transition", "close", "ABC-1", "-o", "novalue"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected key=value"));
}

#[test]
fn test_export_templates_to_dir() {
    let ctx = TestContext::new();
    let out = ctx.root().join("exported");

    ctx.jira()
        .args(["export-templates", "--dir"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(out.join("view").is_file());
    assert!(out.join("edit").is_file());
    assert!(out.join("transition").is_file());
}

#[test]
fn test_export_templates_keeps_existing_files() {
    let ctx = TestContext::new();
    ctx.write(".jira.d/templates/view", "mine\n");

    ctx.jira().arg("export-templates").assert().success();

    let view = fs::read_to_string(ctx.jira_home().join("templates/view")).unwrap();
    assert_eq!(view, "mine\n");
    assert!(ctx.jira_home().join("templates/list").is_file());
}

#[test]
fn test_quiet_export_prints_nothing() {
    let ctx = TestContext::new();
    ctx.jira()
        .args(["--quiet", "export-templates"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_broken_config_is_invalid_argument() {
    let ctx = TestContext::new();
    ctx.write(".jira.d/config.toml", "endpoint = [unterminated\n");

    ctx.jira().args(["view", "ABC-1"]).assert().code(2);
}

#[test]
fn test_unreachable_server_is_external_error() {
    let ctx = TestContext::new();
    ctx.jira()
        .args(["--endpoint", DEAD_ENDPOINT, "view", "ABC-1"])
        .assert()
        .code(10);
}

#[test]
fn test_project_config_supplies_endpoint() {
    let ctx = TestContext::new();
    ctx.write(
        "work/.jira.d/config.toml",
        &format!("endpoint = \"{}\"\n", DEAD_ENDPOINT),
    );
    let nested = ctx.root().join("work/src/deep");
    fs::create_dir_all(&nested).unwrap();

    // Exit 10 instead of 2 means the endpoint was found by walking up.
    ctx.jira()
        .current_dir(&nested)
        .args(["request", "/rest/api/2/myself"])
        .assert()
        .code(10);
}

#[test]
fn test_invalid_request_method() {
    let ctx = TestContext::new();
    ctx.jira()
        .args(["--endpoint", DEAD_ENDPOINT, "request", "-M", "FETCH", "/x"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid HTTP method"));
}

#[test]
fn test_noedit_comment_still_needs_server() {
    let ctx = TestContext::new();
    ctx.jira()
        .args(["--noedit", "comment", "ABC-1", "-m", "hello"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No Jira endpoint configured"));

    ctx.jira()
        .args(["--endpoint", DEAD_ENDPOINT, "--noedit", "edit", "ABC-1"])
        .assert()
        .code(10);
}
