//! Shared test utilities
//!
//! Common helpers used across multiple test modules to reduce duplication.

#![cfg(test)]

use serde_json::{json, Value};
use tempfile::TempDir;

use crate::commands::CommandExecutor;
use crate::config::{ConfigLayer, JiraPaths, Settings};
use crate::edit::ScriptedPrompter;
use crate::transport::{
    AuthenticatedClient, CookieStore, Credentials, ScriptedBackend, StaticCredentials,
};

pub const ENDPOINT: &str = "https://jira.example.com";

/// A scripted Jira server. Clones of `backend` share the queue and request log.
pub struct TestServer {
    pub backend: ScriptedBackend,
}

impl TestServer {
    pub fn new() -> Self {
        Self {
            backend: ScriptedBackend::new(),
        }
    }
}

/// Executor wired to `server`, with its `.jira.d` in a fresh temp dir.
///
/// The prompter answers "no" to everything; swap in another with
/// `with_prompter` when a test needs retries.
pub fn executor_with(
    server: &TestServer,
    editing: bool,
) -> (TempDir, CommandExecutor<ScriptedBackend>) {
    let temp = TempDir::new().unwrap();
    let paths = JiraPaths::new(temp.path().join(".jira.d"));
    let settings = Settings::from_layer(ConfigLayer {
        endpoint: Some(ENDPOINT.to_string()),
        user: Some("alice".to_string()),
        edit: Some(editing),
        ..ConfigLayer::default()
    });
    let client = AuthenticatedClient::new(
        server.backend.clone(),
        ENDPOINT,
        CookieStore::new(paths.cookie_file()),
        Box::new(StaticCredentials(Credentials {
            user: "alice".to_string(),
            password: "secret".to_string(),
        })),
    )
    .unwrap();
    let executor = CommandExecutor::new(client, settings, paths, temp.path())
        .with_prompter(Box::new(ScriptedPrompter::new([])));
    (temp, executor)
}

/// Minimal issue payload as returned by `GET /rest/api/2/issue/{key}`.
pub fn issue_json(key: &str, summary: &str) -> Value {
    json!({
        "key": key,
        "fields": {
            "summary": summary,
            "description": "Something broke",
            "status": {"name": "Open"},
            "project": {"key": key.split('-').next().unwrap_or(key)},
            "issuetype": {"name": "Bug"},
            "priority": {"name": "Major"}
        }
    })
}
