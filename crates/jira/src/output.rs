//! Output helpers and process exit codes.

use std::fmt::Display;
use std::io::{self, Write};

/// Context for controlling output verbosity
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputContext {
    quiet: bool,
}

impl OutputContext {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print essential output (rendered templates, command results)
    pub fn print_data(&self, msg: impl Display) -> io::Result<()> {
        write_safe(&format!("{}", msg))
    }

    /// Print success line such as `OK ABC-1 <url>` (suppressed by --quiet)
    pub fn print_success(&self, msg: impl Display) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln_safe(&format!("{}", msg))
    }

    /// Print warning (suppressed by --quiet)
    pub fn print_warning(&self, msg: impl Display) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln_safe_stderr(&format!("Warning: {}", msg))
    }

    /// Print error (always shown to stderr)
    pub fn print_error(&self, msg: impl Display) -> io::Result<()> {
        writeln_safe_stderr(&format!("Error: {}", msg))
    }
}

/// Rendered templates carry their own trailing newline, so no newline is added.
fn write_safe(msg: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    match write!(stdout, "{}", msg).and_then(|_| stdout.flush()) {
        Ok(_) => Ok(()),
        // Expected when piping to head and friends
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => std::process::exit(0),
        Err(e) => Err(e),
    }
}

fn writeln_safe(msg: &str) -> io::Result<()> {
    match writeln!(io::stdout(), "{}", msg) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => std::process::exit(0),
        Err(e) => Err(e),
    }
}

fn writeln_safe_stderr(msg: &str) -> io::Result<()> {
    match writeln!(io::stderr(), "{}", msg) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => std::process::exit(0),
        Err(e) => Err(e),
    }
}

/// Exit codes for the jira CLI
///
/// # Examples
///
/// ```rust
/// use jira::ExitCode;
///
/// assert_eq!(ExitCode::Success.code(), 0);
/// assert_eq!(ExitCode::Aborted.code(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command succeeded (0)
    Success = 0,

    /// Generic error (1)
    GenericError = 1,

    /// Invalid arguments, missing configuration (2)
    InvalidArgument = 2,

    /// Issue, transition or template not found (3)
    NotFound = 3,

    /// Edited document rejected before submission (4)
    ValidationFailed = 4,

    /// Authentication failed (5)
    PermissionDenied = 5,

    /// Edit aborted by the user or left unchanged (7)
    Aborted = 7,

    /// Network or server failure (10)
    ExternalError = 10,
}

impl ExitCode {
    /// Convert exit code to i32 for `std::process::exit`
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Command succeeded",
            ExitCode::GenericError => "Generic error occurred",
            ExitCode::InvalidArgument => "Invalid arguments or configuration",
            ExitCode::NotFound => "Resource not found (issue, transition, template)",
            ExitCode::ValidationFailed => "Edited document failed validation",
            ExitCode::PermissionDenied => "Authentication failed",
            ExitCode::Aborted => "Edit aborted or no changes made",
            ExitCode::ExternalError => "Jira server or network failure",
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code() as u8)
    }
}
