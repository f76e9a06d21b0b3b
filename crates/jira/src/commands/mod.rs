//! Command execution logic for all CLI operations.
//!
//! The `CommandExecutor` maps each subcommand onto REST calls, template
//! rendering and edit sessions. It is generic over the HTTP backend so the
//! whole flow can run against a scripted server in tests.

mod issue;
mod request;
mod session;
mod transition;

pub use issue::build_jql;
pub use request::{browse_url, open_in_browser};
pub use session::PromptCredentials;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::config::{JiraPaths, Settings};
use crate::edit::{
    resolve_editor, CommandEditor, EditOptions, EditOutcome, EditSession, Editor, Prompter,
    TerminalPrompter,
};
use crate::output::OutputContext;
use crate::templates::{self, TemplateContext, TemplateResolver};
use crate::transport::{AuthenticatedClient, HttpBackend, HttpResponse, Method};

/// A REST call that reached the server but did not succeed.
#[derive(Debug, Error)]
#[error("{method} {uri} failed: {status} {body}")]
pub struct ApiError {
    pub method: Method,
    pub uri: String,
    pub status: u16,
    pub body: String,
}

/// Result of an edit-style command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditReport {
    pub outcome: EditOutcome,
    /// Key of the issue that was changed or created.
    pub key: Option<String>,
}

/// Executes CLI commands against a Jira server.
///
/// Generic over the HTTP backend to support the real agent and the
/// scripted one used in tests.
pub struct CommandExecutor<B: HttpBackend> {
    client: AuthenticatedClient<B>,
    settings: Settings,
    paths: JiraPaths,
    resolver: TemplateResolver,
    output: OutputContext,
    editor: Box<dyn Editor>,
    prompter: Box<dyn Prompter>,
}

impl<B: HttpBackend> CommandExecutor<B> {
    /// `start_dir` is where project-local templates are searched from.
    pub fn new(
        client: AuthenticatedClient<B>,
        settings: Settings,
        paths: JiraPaths,
        start_dir: &Path,
    ) -> Self {
        let resolver = TemplateResolver::new(start_dir, settings.template.clone())
            .with_user_dir(paths.templates_dir());
        let editor = CommandEditor::new(resolve_editor(settings.editor.as_deref()));
        Self {
            client,
            settings,
            paths,
            resolver,
            output: OutputContext::default(),
            editor: Box::new(editor),
            prompter: Box::new(TerminalPrompter),
        }
    }

    pub fn with_output(mut self, output: OutputContext) -> Self {
        self.output = output;
        self
    }

    pub fn with_editor(mut self, editor: Box<dyn Editor>) -> Self {
        self.editor = editor;
        self
    }

    pub fn with_prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn output(&self) -> &OutputContext {
        &self.output
    }

    /// GET a REST path and decode the JSON body.
    fn get_json(&mut self, path: &str) -> Result<Value> {
        let uri = self.client.url(path);
        self.fetch_json(&uri)
    }

    /// Like [`get_json`](Self::get_json), with encoded query parameters.
    fn get_json_with_query(&mut self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let uri = Url::parse_with_params(&self.client.url(path), query)
            .with_context(|| format!("Invalid request URL for {}", path))?;
        self.fetch_json(uri.as_str())
    }

    fn fetch_json(&mut self, uri: &str) -> Result<Value> {
        let response = self.client.get(uri)?;
        ensure_success(Method::Get, uri, &response)?;
        decode(uri, &response)
    }

    /// Resolve a template by name and render it.
    fn render(&self, name: &str, context: &TemplateContext) -> Result<String> {
        let template = self.resolver.resolve(name)?;
        Ok(templates::render(&template, context)?)
    }

    /// Run an edit session, handing the finished payload to `submit`
    /// together with the client.
    fn run_edit<F>(
        &mut self,
        template_name: &str,
        file_prefix: &str,
        editing: bool,
        context: &TemplateContext,
        mut submit: F,
    ) -> Result<EditOutcome>
    where
        F: FnMut(&mut AuthenticatedClient<B>, &str) -> Result<()>,
    {
        let template = self.resolver.resolve(template_name)?;
        let options = EditOptions::new(editing, self.paths.tmp_dir(), file_prefix);
        let client = &mut self.client;
        let mut session = EditSession::new(options, self.editor.as_ref(), self.prompter.as_mut());
        let outcome = session.run(&template, context, |payload| submit(client, payload))?;
        Ok(outcome)
    }
}

/// Turn a non-2xx response into an [`ApiError`].
pub(crate) fn ensure_success(
    method: Method,
    uri: &str,
    response: &HttpResponse,
) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError {
        method,
        uri: uri.to_string(),
        status: response.status,
        body: response.body.clone(),
    })
}

/// Decode a JSON body. An empty body decodes to `null`.
pub(crate) fn decode(uri: &str, response: &HttpResponse) -> Result<Value> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    response
        .json()
        .with_context(|| format!("Invalid JSON in response from {}", uri))
}

/// Turn `key=value` pairs into the `overrides` template variable.
pub(crate) fn overrides_value(pairs: &[(String, String)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

/// Write the built-in templates to `dir`, or `~/.jira.d/templates`.
pub fn export_templates(paths: &JiraPaths, dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let dir = dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| paths.templates_dir());
    let written = templates::export_templates(&dir)
        .with_context(|| format!("Failed to export templates to {}", dir.display()))?;
    Ok(written)
}
