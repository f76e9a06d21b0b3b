//! Jira Command Line Client Library
//!
//! Session-cookie authentication, template rendering, and the edit/retry
//! session used by the `jira` binary. Exposed as a library so the pieces can
//! be exercised in isolation by tests.

pub mod cli;
pub mod commands;
pub mod config;
pub mod edit;
pub mod errors;
pub mod logging;
pub mod output;
pub mod templates;
pub mod transport;
pub mod validation;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use commands::CommandExecutor;
pub use config::{JiraPaths, Settings};
pub use edit::{EditError, EditOptions, EditOutcome, EditSession, EditedDocument};
pub use output::{ExitCode, OutputContext};
pub use templates::{TemplateContext, TemplateResolver};
pub use transport::{AuthenticatedClient, HttpBackend, HttpRequest, HttpResponse, Method};
