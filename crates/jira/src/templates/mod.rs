//! Template lookup and rendering.
//!
//! Templates are looked up by name: an explicit `--template` override wins,
//! then `.jira.d/templates/<name>` in the closest ancestor directory, then the
//! built-in set. Rendering goes through minijinja with a couple of extra
//! filters for laying out text inside YAML.

pub mod builtin;

use minijinja::{Environment, UndefinedBehavior, Value as JinjaValue};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::validation;

/// Relative location of user templates below a `.jira.d`-bearing directory.
pub const TEMPLATE_DIR: &str = ".jira.d/templates";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("No template found named '{0}'")]
    NotFound(String),
    #[error("Failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write template {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to render template: {0}")]
    Render(#[from] minijinja::Error),
}

/// Data a template is rendered against.
///
/// Templates always see a `data` variable holding the whole context value,
/// which is the only way to reach a context built from a non-object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateContext {
    values: Map<String, Value>,
    raw: Option<Value>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON value. Object keys become top-level
    /// variables; anything else is only reachable through `data`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self { values, raw: None },
            other => Self {
                values: Map::new(),
                raw: Some(other),
            },
        }
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Editable field names from `meta.fields`, if the context has any.
    pub fn allowed_fields(&self) -> Option<BTreeSet<String>> {
        validation::allowed_fields(&self.values)
    }

    fn to_render_value(&self) -> Value {
        let mut values = self.values.clone();
        if !values.contains_key("data") {
            let data = match &self.raw {
                Some(raw) => raw.clone(),
                None => Value::Object(self.values.clone()),
            };
            values.insert("data".to_string(), data);
        }
        Value::Object(values)
    }
}

/// Render template text against a context.
pub fn render(template: &str, context: &TemplateContext) -> Result<String, TemplateError> {
    let env = environment();
    Ok(env.render_str(template, context.to_render_value())?)
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    env.add_filter("comment", comment);
    env.add_filter("wrap", wrap);
    env
}

fn text_of(value: &JinjaValue) -> String {
    if value.is_undefined() || value.is_none() {
        String::new()
    } else if let Some(s) = value.as_str() {
        s.to_string()
    } else {
        value.to_string()
    }
}

/// Prefix every line with `# `.
fn comment(value: JinjaValue) -> String {
    text_of(&value)
        .lines()
        .map(|line| format!("# {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Greedy word wrap, keeping existing line breaks.
fn wrap(value: JinjaValue, width: Option<usize>) -> String {
    let width = width.unwrap_or(80).max(1);
    let text = text_of(&value);
    let mut out = Vec::new();
    for line in text.lines() {
        let mut current = String::new();
        for word in line.split_whitespace() {
            if !current.is_empty() && current.len() + 1 + word.len() > width {
                out.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        out.push(current);
    }
    out.join("\n")
}

/// Walk up from `start` and return the first `<dir>/<relative>` that is a file.
pub fn find_closest_parent_path(start: &Path, relative: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(relative))
        .find(|candidate| candidate.is_file())
}

/// Resolves a template name to template text.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    start_dir: PathBuf,
    override_name: Option<String>,
    user_dir: Option<PathBuf>,
}

impl TemplateResolver {
    /// `start_dir` is where the ancestor search for `.jira.d/templates`
    /// begins. `override_name` is the `--template` value, a path or a name.
    pub fn new(start_dir: impl Into<PathBuf>, override_name: Option<String>) -> Self {
        Self {
            start_dir: start_dir.into(),
            override_name,
            user_dir: None,
        }
    }

    /// Also look in `dir` (normally `~/.jira.d/templates`, where
    /// `export-templates` writes) when the ancestor walk finds nothing.
    pub fn with_user_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_dir = Some(dir.into());
        self
    }

    /// Resolve `name` to template text. An override that matches nothing
    /// falls through to the normal lookup of `name`.
    ///
    /// `create-<type>` names fall back to the generic `create` template at
    /// each tier: local `create-bug`, local `create`, built-in `create-bug`,
    /// built-in `create`.
    pub fn resolve(&self, name: &str) -> Result<String, TemplateError> {
        if let Some(override_name) = &self.override_name {
            let path = self.start_dir.join(override_name);
            if path.is_file() {
                debug!("Using template file {}", path.display());
                return read_template(&path);
            }
            if let Some(text) = self.lookup_local(override_name)? {
                return Ok(text);
            }
            if let Some(text) = builtin::get(override_name) {
                return Ok(text.to_string());
            }
            debug!("Template override '{}' not found, using '{}'", override_name, name);
        }

        if let Some(text) = self.lookup_local(name)? {
            return Ok(text);
        }
        let family = family_of(name);
        if let Some(family) = family {
            if let Some(text) = self.lookup_local(family)? {
                return Ok(text);
            }
        }
        if let Some(text) = builtin::get(name) {
            return Ok(text.to_string());
        }
        if let Some(text) = family.and_then(builtin::get) {
            return Ok(text.to_string());
        }
        Err(TemplateError::NotFound(name.to_string()))
    }

    fn lookup_local(&self, name: &str) -> Result<Option<String>, TemplateError> {
        let relative = format!("{}/{}", TEMPLATE_DIR, name);
        let found = find_closest_parent_path(&self.start_dir, &relative).or_else(|| {
            self.user_dir
                .as_ref()
                .map(|dir| dir.join(name))
                .filter(|path| path.is_file())
        });
        match found {
            Some(path) => {
                debug!("Using template {}", path.display());
                read_template(&path).map(Some)
            }
            None => Ok(None),
        }
    }
}

fn family_of(name: &str) -> Option<&'static str> {
    if name != "create" && name.starts_with("create-") {
        Some("create")
    } else {
        None
    }
}

fn read_template(path: &Path) -> Result<String, TemplateError> {
    fs::read_to_string(path).map_err(|source| TemplateError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Write every built-in template into `dir`, skipping files that already
/// exist. Returns the paths written.
pub fn export_templates(dir: &Path) -> Result<Vec<PathBuf>, TemplateError> {
    fs::create_dir_all(dir).map_err(|source| TemplateError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::new();
    for (name, text) in builtin::all() {
        let path = dir.join(name);
        if path.exists() {
            debug!("Skipping existing template {}", path.display());
            continue;
        }
        fs::write(&path, text).map_err(|source| TemplateError::Write {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    Ok(written)
}
