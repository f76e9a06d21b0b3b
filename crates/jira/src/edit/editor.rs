//! External editor resolution and invocation.

use std::env;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Editor used when nothing else is configured.
pub const FALLBACK_EDITOR: &str = "vim";

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Invalid editor command '{command}': {reason}")]
    InvalidCommand { command: String, reason: String },
    #[error("Failed to run editor '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("Editor '{command}' exited with {status}")]
    Exit { command: String, status: String },
}

/// Something that lets a human edit a file in place.
pub trait Editor {
    fn edit(&self, path: &Path) -> Result<(), EditorError>;
}

/// Editor backed by a closure, for driving sessions without a terminal.
pub struct FnEditor<F>(pub F);

impl<F> Editor for FnEditor<F>
where
    F: Fn(&Path) -> Result<(), EditorError>,
{
    fn edit(&self, path: &Path) -> Result<(), EditorError> {
        (self.0)(path)
    }
}

/// Pick the editor command: explicit option, then `JIRA_EDITOR`, then
/// `EDITOR`, then [`FALLBACK_EDITOR`].
pub fn resolve_editor(explicit: Option<&str>) -> String {
    resolve_editor_with(explicit, |key| env::var(key).ok())
}

/// [`resolve_editor`] with an injectable environment lookup.
pub fn resolve_editor_with<F>(explicit: Option<&str>, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .map(str::to_string)
        .or_else(|| lookup("JIRA_EDITOR"))
        .or_else(|| lookup("EDITOR"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_EDITOR.to_string())
}

/// Runs a shell-style command line with the file path appended.
///
/// The child inherits stdin/stdout/stderr so terminal editors work.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    command: String,
}

impl CommandEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn argv(&self, path: &Path) -> Result<Vec<String>, EditorError> {
        let mut argv =
            shell_words::split(&self.command).map_err(|e| EditorError::InvalidCommand {
                command: self.command.clone(),
                reason: e.to_string(),
            })?;
        if argv.is_empty() {
            return Err(EditorError::InvalidCommand {
                command: self.command.clone(),
                reason: "empty command".to_string(),
            });
        }
        argv.push(path.to_string_lossy().to_string());
        Ok(argv)
    }
}

impl Editor for CommandEditor {
    fn edit(&self, path: &Path) -> Result<(), EditorError> {
        let argv = self.argv(path)?;
        debug!("Running: {:?}", argv);

        let status = Command::new(&argv[0])
            .args(&argv[1..])
            .status()
            .map_err(|source| EditorError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(EditorError::Exit {
                command: self.command.clone(),
                status: status.to_string(),
            })
        }
    }
}
