//! `jira` command-line entry point.

use anyhow::Result;
use clap::Parser;
use std::env;
use std::path::Path;

use jira::cli::{rewrite_default_command, Cli, Commands};
use jira::commands::{self, CommandExecutor, EditReport, PromptCredentials};
use jira::config::{ConfigLoader, JiraPaths, Settings};
use jira::edit::TerminalPrompter;
use jira::errors::{self, ActionableError};
use jira::logging;
use jira::transport::{AuthenticatedClient, CookieStore, UreqBackend};
use jira::{EditOutcome, ExitCode, OutputContext};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse_from(rewrite_default_command(env::args().collect()));
    let level = logging::level_for(cli.global.verbose, env::var("JIRA_DEBUG").ok().as_deref());
    let dispatch = logging::dispatch(level);

    let exit_code = tracing::dispatcher::with_default(&dispatch, || match run(cli) {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<ActionableError>() {
                Some(actionable) => eprint!("{}", actionable),
                None => {
                    let _ = OutputContext::default().print_error(format!("{:#}", e));
                }
            }
            let code = errors::exit_code_for(&e);
            tracing::debug!("Exiting with {}: {}", code.code(), code.description());
            code
        }
    });

    exit_code.into()
}

fn run(cli: Cli) -> Result<ExitCode> {
    let output = OutputContext::new(cli.global.quiet);
    let current_dir = env::current_dir()?;
    let paths = JiraPaths::from_env()?;
    let settings = ConfigLoader::new()
        .with_user_config(&paths)?
        .with_project_config(&current_dir)?
        .with_cli(cli.global.config_layer())
        .build();

    // Commands that never talk to the server.
    match &cli.command {
        Commands::ExportTemplates { dir } => {
            for path in commands::export_templates(&paths, dir.as_deref())? {
                output.print_success(format!("Created {}", path.display()))?;
            }
            return Ok(ExitCode::Success);
        }
        Commands::Browse { issue } => {
            let url = commands::browse_url(&settings, issue)?;
            commands::open_in_browser(&url)?;
            output.print_success(url)?;
            return Ok(ExitCode::Success);
        }
        _ => {}
    }

    let mut executor = connect(settings, paths, &current_dir)?.with_output(output);

    match cli.command {
        Commands::Login => {
            executor.login()?;
            output.print_success("OK Logged in")?;
        }
        Commands::Logout => {
            executor.logout()?;
            output.print_success("OK Logged out")?;
        }
        Commands::List(args) => output.print_data(executor.list(&args)?)?,
        Commands::View { issue } => output.print_data(executor.view(&issue)?)?,
        Commands::Edit { issue } => {
            let report = executor.edit(&issue)?;
            return report_edit(&executor, &report);
        }
        Commands::Create(args) => {
            let report = executor.create(&args)?;
            return report_edit(&executor, &report);
        }
        Commands::Comment { issue, comment } => {
            let report = executor.comment(&issue, comment.as_deref())?;
            return report_edit(&executor, &report);
        }
        Commands::Transitions { issue } => output.print_data(executor.transitions(&issue)?)?,
        Commands::Transition {
            transition,
            issue,
            comment,
            overrides,
        } => {
            let report =
                executor.transition(&transition, &issue, comment.as_deref(), &overrides)?;
            return report_edit(&executor, &report);
        }
        Commands::Editmeta { issue } => output.print_data(executor.editmeta(&issue)?)?,
        Commands::Createmeta { project, issuetype } => output.print_data(
            executor.createmeta(project.as_deref(), issuetype.as_deref())?,
        )?,
        Commands::Fields => output.print_data(executor.fields()?)?,
        Commands::Request { uri, data, method } => {
            output.print_data(executor.request(&method, &uri, data.as_deref())?)?
        }
        Commands::ExportTemplates { .. } | Commands::Browse { .. } => {}
    }
    Ok(ExitCode::Success)
}

/// Build an executor talking to the configured endpoint.
fn connect(
    settings: Settings,
    paths: JiraPaths,
    current_dir: &Path,
) -> Result<CommandExecutor<UreqBackend>> {
    let endpoint = settings
        .endpoint
        .clone()
        .ok_or_else(errors::missing_endpoint)?;
    let user = settings
        .user
        .clone()
        .or_else(|| env::var("USER").ok().filter(|u| !u.is_empty()));

    let backend = UreqBackend::new(settings.insecure)?;
    let credentials = PromptCredentials::new(user, Box::new(TerminalPrompter));
    let client = AuthenticatedClient::new(
        backend,
        &endpoint,
        CookieStore::new(paths.cookie_file()),
        Box::new(credentials),
    )?;
    Ok(CommandExecutor::new(client, settings, paths, current_dir))
}

fn report_edit(executor: &CommandExecutor<UreqBackend>, report: &EditReport) -> Result<ExitCode> {
    let output = executor.output();
    match report.outcome {
        EditOutcome::Submitted => {
            if let Some(key) = &report.key {
                let url = executor.settings().browse_url(key).unwrap_or_default();
                output.print_success(format!("OK {} {}", key, url))?;
            }
            Ok(ExitCode::Success)
        }
        EditOutcome::NoChanges => {
            output.print_warning("No changes found, aborting")?;
            Ok(ExitCode::Aborted)
        }
        EditOutcome::Aborted => {
            output.print_warning("abort flag found in template, quitting")?;
            Ok(ExitCode::Aborted)
        }
    }
}
