//! Command-line interface definitions using clap.

use clap::{ArgAction, Args, Parser, Subcommand};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::config::ConfigLayer;

/// Command-line client for Jira
///
/// Issues are edited as YAML documents in your editor. `jira ABC-123` is
/// shorthand for `jira view ABC-123`.
///
/// Exit Codes:
///   0  - Command succeeded
///   1  - Generic error occurred
///   2  - Invalid arguments or configuration
///   3  - Resource not found (issue, transition, template)
///   4  - Edited document failed validation
///   5  - Authentication failed
///   7  - Edit aborted or no changes made
///  10  - Jira server or network failure
#[derive(Parser, Debug)]
#[command(name = "jira", version)]
#[command(about = "Command-line client for Jira", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output (for scripting)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Base URL of the Jira server
    #[arg(short, long, global = true, env = "JIRA_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Jira user name
    #[arg(short, long, global = true, env = "JIRA_USER")]
    pub user: Option<String>,

    /// Editor command for edit-style commands
    #[arg(long, global = true)]
    pub editor: Option<String>,

    /// Template file or name to use instead of the command's default
    #[arg(short, long, global = true, env = "JIRA_TEMPLATE")]
    pub template: Option<String>,

    /// Submit the rendered template without opening an editor
    #[arg(long, global = true)]
    pub noedit: bool,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,
}

impl GlobalArgs {
    /// The command-line layer of the configuration. Unset flags stay `None`
    /// so file values show through.
    pub fn config_layer(&self) -> ConfigLayer {
        ConfigLayer {
            endpoint: self.endpoint.clone(),
            user: self.user.clone(),
            editor: self.editor.clone(),
            template: self.template.clone(),
            edit: self.noedit.then_some(false),
            insecure: self.insecure.then_some(true),
            ..ConfigLayer::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and save the session cookie
    Login,

    /// End the session and remove the saved cookie
    Logout,

    /// List issues matching a query
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Print an issue
    View {
        /// Issue key, e.g. ABC-123
        issue: String,
    },

    /// Edit an issue in your editor
    Edit {
        issue: String,
    },

    /// Create an issue
    Create(CreateArgs),

    /// Add a comment to an issue
    Comment {
        issue: String,

        /// Comment text; skips the editor
        #[arg(short = 'm', long)]
        comment: Option<String>,
    },

    /// List the transitions available for an issue
    Transitions {
        issue: String,
    },

    /// Move an issue through a workflow transition
    #[command(visible_alias = "trans")]
    Transition {
        /// Transition name, matched case-insensitively
        transition: String,

        issue: String,

        /// Comment to attach to the transition
        #[arg(short = 'm', long)]
        comment: Option<String>,

        /// Template values, as key=value
        #[arg(short = 'o', long = "override", value_parser = parse_override)]
        overrides: Vec<(String, String)>,
    },

    /// Print the edit metadata for an issue
    Editmeta {
        issue: String,
    },

    /// Print the create metadata for a project and issue type
    Createmeta {
        #[arg(short, long, env = "JIRA_PROJECT")]
        project: Option<String>,

        #[arg(short, long)]
        issuetype: Option<String>,
    },

    /// Print all field definitions
    Fields,

    /// Write the built-in templates to ~/.jira.d/templates
    ExportTemplates {
        /// Target directory
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Open an issue in the web browser
    #[command(visible_alias = "b")]
    Browse {
        issue: String,
    },

    /// Send an arbitrary REST request and print the response
    #[command(visible_alias = "req")]
    Request {
        /// Path below the endpoint (e.g. /rest/api/2/myself) or full URL
        uri: String,

        /// Request body
        data: Option<String>,

        /// HTTP method
        #[arg(short = 'M', long, default_value = "GET")]
        method: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Raw JQL; the other filters are ignored when given
    #[arg(long)]
    pub query: Option<String>,

    #[arg(short, long, env = "JIRA_PROJECT")]
    pub project: Option<String>,

    #[arg(short, long)]
    pub component: Option<String>,

    #[arg(short, long)]
    pub assignee: Option<String>,

    #[arg(short, long)]
    pub issuetype: Option<String>,

    #[arg(short, long)]
    pub watcher: Option<String>,

    #[arg(short, long)]
    pub reporter: Option<String>,

    /// ORDER BY clause
    #[arg(short, long)]
    pub sort: Option<String>,

    /// Maximum number of results
    #[arg(short = 'l', long = "limit")]
    pub max_results: Option<u32>,

    /// Comma-separated fields to fetch
    #[arg(short = 'f', long = "queryfields")]
    pub query_fields: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CreateArgs {
    #[arg(short, long, env = "JIRA_PROJECT")]
    pub project: Option<String>,

    #[arg(short, long)]
    pub issuetype: Option<String>,

    /// Template values, as key=value (e.g. -o summary="Crash on start")
    #[arg(short = 'o', long = "override", value_parser = parse_override)]
    pub overrides: Vec<(String, String)>,
}

fn parse_override(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

static ISSUE_KEY: OnceLock<Regex> = OnceLock::new();

fn issue_key_regex() -> &'static Regex {
    ISSUE_KEY.get_or_init(|| {
        Regex::new(r"^[A-Z][A-Z0-9]*-[0-9]+$").expect("Issue key regex should compile")
    })
}

/// True for strings shaped like an issue key (`ABC-123`).
pub fn is_issue_key(value: &str) -> bool {
    issue_key_regex().is_match(value)
}

/// Global options that consume the following argument.
const VALUE_OPTIONS: &[&str] = &[
    "-e",
    "--endpoint",
    "-u",
    "--user",
    "--editor",
    "-t",
    "--template",
];

/// Rewrite `jira [opts] ABC-123 ...` to `jira [opts] view ABC-123 ...`.
///
/// Only the first positional argument is considered, and only when it is
/// shaped like an issue key. Everything else is returned untouched.
pub fn rewrite_default_command(args: Vec<String>) -> Vec<String> {
    let mut index = 1;
    while index < args.len() {
        let arg = &args[index];
        if arg == "--" {
            break;
        }
        if arg.starts_with('-') {
            index += if VALUE_OPTIONS.contains(&arg.as_str()) { 2 } else { 1 };
            continue;
        }
        if is_issue_key(arg) {
            let mut rewritten = args;
            rewritten.insert(index, "view".to_string());
            return rewritten;
        }
        break;
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_issue_key_shape() {
        assert!(is_issue_key("ABC-123"));
        assert!(is_issue_key("A1-1"));
        assert!(!is_issue_key("abc-123"));
        assert!(!is_issue_key("ABC"));
        assert!(!is_issue_key("1BC-2"));
        assert!(!is_issue_key("ABC-12x"));
    }

    #[test]
    fn test_rewrite_bare_key() {
        assert_eq!(
            rewrite_default_command(strings(&["jira", "ABC-1"])),
            strings(&["jira", "view", "ABC-1"])
        );
    }

    #[test]
    fn test_rewrite_skips_option_values() {
        assert_eq!(
            rewrite_default_command(strings(&["jira", "-e", "https://x", "-v", "ABC-1"])),
            strings(&["jira", "-e", "https://x", "-v", "view", "ABC-1"])
        );
    }

    #[test]
    fn test_rewrite_leaves_subcommands_alone() {
        let args = strings(&["jira", "edit", "ABC-1"]);
        assert_eq!(rewrite_default_command(args.clone()), args);

        let args = strings(&["jira", "list", "--project", "ABC"]);
        assert_eq!(rewrite_default_command(args.clone()), args);
    }

    #[test]
    fn test_parse_rewritten_view() {
        let cli = Cli::try_parse_from(rewrite_default_command(strings(&["jira", "ABC-1"]))).unwrap();
        assert!(matches!(cli.command, Commands::View { issue } if issue == "ABC-1"));
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "jira",
            "create",
            "-p",
            "abc",
            "-o",
            "summary=Crash: on start",
            "-o",
            "priority=Major",
        ])
        .unwrap();
        match cli.command {
            Commands::Create(args) => {
                assert_eq!(args.project.as_deref(), Some("abc"));
                assert_eq!(
                    args.overrides,
                    vec![
                        ("summary".to_string(), "Crash: on start".to_string()),
                        ("priority".to_string(), "Major".to_string()),
                    ]
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_bad_override_rejected() {
        assert!(Cli::try_parse_from(["jira", "create", "-o", "novalue"]).is_err());
    }

    #[test]
    fn test_config_layer_only_sets_given_flags() {
        let cli = Cli::try_parse_from(["jira", "--noedit", "fields"]).unwrap();
        let layer = cli.global.config_layer();
        assert_eq!(layer.edit, Some(false));
        assert_eq!(layer.insecure, None);
    }
}
