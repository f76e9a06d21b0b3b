//! Actionable error formatting.
//!
//! Errors raised at the command layer carry possible causes and remediation
//! steps, plus the exit code the process should end with.

use std::fmt;

use crate::commands::ApiError;
use crate::config::ConfigError;
use crate::edit::EditError;
use crate::output::ExitCode;
use crate::templates::TemplateError;
use crate::transport::TransportError;

/// An error with diagnostic context and remediation steps.
///
/// # Example
///
/// ```
/// use jira::errors::ActionableError;
///
/// let error = ActionableError::new("Issue ABC-1 has no transition named 'done'")
///     .with_cause("The workflow may use a different name")
///     .with_remedy("List transitions: jira transitions ABC-1");
///
/// eprintln!("{}", error);
/// ```
#[derive(Debug, Clone)]
pub struct ActionableError {
    error: String,
    causes: Vec<String>,
    remediation: Vec<String>,
    exit_code: ExitCode,
}

impl ActionableError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            causes: Vec::new(),
            remediation: Vec::new(),
            exit_code: ExitCode::GenericError,
        }
    }

    /// Add a possible cause (diagnostic hint).
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Add a remediation step (actionable fix).
    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remediation.push(remedy.into());
        self
    }

    pub fn with_exit_code(mut self, code: ExitCode) -> Self {
        self.exit_code = code;
        self
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    /// Convert to a formatted error message suitable for display.
    pub fn to_error_message(&self) -> String {
        let mut msg = format!("Error: {}\n", self.error);

        if !self.causes.is_empty() {
            msg.push_str("\nPossible causes:\n");
            for cause in &self.causes {
                msg.push_str(&format!("  • {}\n", cause));
            }
        }

        if !self.remediation.is_empty() {
            msg.push_str("\nTo fix:\n");
            for remedy in &self.remediation {
                msg.push_str(&format!("  • {}\n", remedy));
            }
        }

        msg
    }
}

impl fmt::Display for ActionableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error_message())
    }
}

impl std::error::Error for ActionableError {}

pub fn missing_endpoint() -> ActionableError {
    ActionableError::new("No Jira endpoint configured")
        .with_cause("Neither --endpoint nor JIRA_ENDPOINT is set")
        .with_cause("No .jira.d/config.toml with an endpoint was found")
        .with_remedy("Pass the server URL: jira --endpoint https://jira.example.com ...")
        .with_remedy("Or add `endpoint = \"https://jira.example.com\"` to ~/.jira.d/config.toml")
        .with_exit_code(ExitCode::InvalidArgument)
}

pub fn login_failed(user: &str, status: u16) -> ActionableError {
    ActionableError::new(format!("Login failed for user {} (HTTP {})", user, status))
        .with_cause("The password may be wrong")
        .with_cause("The account may be locked after too many failed attempts")
        .with_remedy("Log in explicitly: jira login")
        .with_remedy("Set JIRA_PASSWORD for non-interactive use")
        .with_exit_code(ExitCode::PermissionDenied)
}

pub fn unknown_transition(issue: &str, name: &str, available: &[String]) -> ActionableError {
    let mut error =
        ActionableError::new(format!("Issue {} has no transition named '{}'", issue, name))
            .with_cause("The issue may be in a state where that transition is unavailable");
    if !available.is_empty() {
        error = error.with_cause(format!("Available: {}", available.join(", ")));
    }
    error
        .with_remedy(format!("List transitions: jira transitions {}", issue))
        .with_exit_code(ExitCode::NotFound)
}

pub fn missing_project() -> ActionableError {
    ActionableError::new("No project given for new issue")
        .with_remedy("Pass --project KEY")
        .with_remedy("Or set `project = \"KEY\"` in .jira.d/config.toml")
        .with_exit_code(ExitCode::InvalidArgument)
}

pub fn missing_user() -> ActionableError {
    ActionableError::new("No Jira user configured")
        .with_remedy("Pass --user NAME, set JIRA_USER, or add `user = \"NAME\"` to config.toml")
        .with_exit_code(ExitCode::InvalidArgument)
}

/// Pick the process exit code for an error that reached `main`.
///
/// Typed errors are matched first; an I/O error falls back to its kind.
pub fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    if let Some(actionable) = error.downcast_ref::<ActionableError>() {
        return actionable.exit_code();
    }
    if let Some(api) = error.downcast_ref::<ApiError>() {
        return match api.status {
            404 => ExitCode::NotFound,
            401 | 403 => ExitCode::PermissionDenied,
            _ => ExitCode::ExternalError,
        };
    }
    if let Some(transport) = error.downcast_ref::<TransportError>() {
        return match transport {
            TransportError::LoginFailed { .. } | TransportError::Credentials(_) => {
                ExitCode::PermissionDenied
            }
            _ => ExitCode::ExternalError,
        };
    }
    if let Some(edit) = error.downcast_ref::<EditError>() {
        return match edit {
            EditError::Validation(_) | EditError::Parse(_) => ExitCode::ValidationFailed,
            EditError::Render(TemplateError::NotFound(_)) => ExitCode::NotFound,
            EditError::Render(_) | EditError::Encode(_) => ExitCode::GenericError,
            EditError::Scratch { .. } | EditError::Editor(_) | EditError::Read { .. } => {
                ExitCode::ExternalError
            }
            EditError::Submit(inner) => exit_code_for(inner),
        };
    }
    if let Some(TemplateError::NotFound(_)) = error.downcast_ref::<TemplateError>() {
        return ExitCode::NotFound;
    }
    if error.downcast_ref::<ConfigError>().is_some() {
        return ExitCode::InvalidArgument;
    }
    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        return match io_error.kind() {
            std::io::ErrorKind::NotFound => ExitCode::NotFound,
            std::io::ErrorKind::PermissionDenied => ExitCode::PermissionDenied,
            _ => ExitCode::ExternalError,
        };
    }
    ExitCode::GenericError
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Method;

    #[test]
    fn test_actionable_error_formatting() {
        let error = ActionableError::new("Test error")
            .with_cause("First cause")
            .with_cause("Second cause")
            .with_remedy("First remedy")
            .with_remedy("Second remedy");

        let msg = error.to_error_message();

        assert!(msg.contains("Error: Test error"));
        assert!(msg.contains("Possible causes:"));
        assert!(msg.contains("• First cause"));
        assert!(msg.contains("• Second cause"));
        assert!(msg.contains("To fix:"));
        assert!(msg.contains("• Second remedy"));
        assert_eq!(error.exit_code(), ExitCode::GenericError);
    }

    #[test]
    fn test_error_without_causes() {
        let msg = ActionableError::new("Simple error")
            .with_remedy("Just fix it")
            .to_error_message();

        assert!(!msg.contains("Possible causes:"));
        assert!(msg.contains("• Just fix it"));
    }

    #[test]
    fn test_missing_endpoint_helper() {
        let error = missing_endpoint();
        assert!(error.to_error_message().contains("--endpoint"));
        assert_eq!(error.exit_code(), ExitCode::InvalidArgument);
    }

    #[test]
    fn test_unknown_transition_lists_available() {
        let error = unknown_transition("ABC-1", "done", &["Start".into(), "Close".into()]);
        let msg = error.to_error_message();
        assert!(msg.contains("no transition named 'done'"));
        assert!(msg.contains("Available: Start, Close"));
        assert!(msg.contains("jira transitions ABC-1"));
        assert_eq!(error.exit_code(), ExitCode::NotFound);
    }

    #[test]
    fn test_login_failed_helper() {
        let error = login_failed("alice", 401);
        assert!(error.to_error_message().contains("alice (HTTP 401)"));
        assert_eq!(error.exit_code(), ExitCode::PermissionDenied);
    }

    #[test]
    fn test_exit_code_for_typed_errors() {
        let not_found = anyhow::Error::new(ApiError {
            method: Method::Get,
            uri: "u".into(),
            status: 404,
            body: String::new(),
        });
        assert_eq!(exit_code_for(&not_found), ExitCode::NotFound);

        let login = anyhow::Error::new(TransportError::LoginFailed {
            user: "alice".into(),
            status: 403,
            body: String::new(),
        });
        assert_eq!(exit_code_for(&login), ExitCode::PermissionDenied);

        let missing = anyhow::Error::new(TemplateError::NotFound("nope".into()));
        assert_eq!(exit_code_for(&missing), ExitCode::NotFound);

        let actionable = anyhow::Error::new(missing_project());
        assert_eq!(exit_code_for(&actionable), ExitCode::InvalidArgument);

        assert_eq!(
            exit_code_for(&anyhow::anyhow!("something else")),
            ExitCode::GenericError
        );
    }

    #[test]
    fn test_exit_code_for_failed_submit_uses_inner_error() {
        let inner = anyhow::Error::new(ApiError {
            method: Method::Put,
            uri: "u".into(),
            status: 500,
            body: "boom".into(),
        });
        let submit = anyhow::Error::new(EditError::Submit(inner));
        assert_eq!(exit_code_for(&submit), ExitCode::ExternalError);
    }
}
