//! Configuration file loading and merging.
//!
//! Settings come from `~/.jira.d/config.toml`, then the nearest
//! `.jira.d/config.toml` above the current directory, then the command line
//! (which clap already merged with `JIRA_*` environment variables). Later
//! layers win key by key.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Relative location of a project config below an ancestor directory.
pub const PROJECT_CONFIG: &str = ".jira.d/config.toml";

pub const DEFAULT_MAX_RESULTS: u32 = 500;
pub const DEFAULT_QUERY_FIELDS: &str = "summary";
pub const DEFAULT_SORT: &str = "priority asc, key";
pub const DEFAULT_ISSUETYPE: &str = "Bug";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Cannot determine home directory; set JIRA_HOME")]
    NoHome,
}

/// One layer of settings. Every key is optional so layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub endpoint: Option<String>,
    pub user: Option<String>,
    pub project: Option<String>,
    pub editor: Option<String>,
    pub template: Option<String>,
    /// Open the editor for edit-style commands.
    pub edit: Option<bool>,
    /// Skip TLS certificate verification.
    pub insecure: Option<bool>,
    pub max_results: Option<u32>,
    pub query_fields: Option<String>,
    pub sort: Option<String>,
    pub issuetype: Option<String>,
}

impl ConfigLayer {
    /// Load a layer from a TOML file. A missing file is an empty layer.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let layer = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config {}", path.display());
        Ok(layer)
    }

    /// Keys set in `over` replace keys set here.
    pub fn merge(self, over: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            endpoint: over.endpoint.or(self.endpoint),
            user: over.user.or(self.user),
            project: over.project.or(self.project),
            editor: over.editor.or(self.editor),
            template: over.template.or(self.template),
            edit: over.edit.or(self.edit),
            insecure: over.insecure.or(self.insecure),
            max_results: over.max_results.or(self.max_results),
            query_fields: over.query_fields.or(self.query_fields),
            sort: over.sort.or(self.sort),
            issuetype: over.issuetype.or(self.issuetype),
        }
    }
}

/// Builder for loading configuration from multiple sources with priority.
///
/// Priority order (highest to lowest):
/// 1. Command line / environment
/// 2. Project config (nearest `.jira.d/config.toml`)
/// 3. User config (`~/.jira.d/config.toml`)
/// 4. Defaults
#[derive(Debug, Default)]
pub struct ConfigLoader {
    user: ConfigLayer,
    project: ConfigLayer,
    cli: ConfigLayer,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_config(mut self, paths: &JiraPaths) -> Result<Self, ConfigError> {
        self.user = ConfigLayer::load(&paths.user_config())?;
        Ok(self)
    }

    /// Load the nearest project config walking up from `start`.
    pub fn with_project_config(mut self, start: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = find_project_config(start) {
            self.project = ConfigLayer::load(&path)?;
        }
        Ok(self)
    }

    pub fn with_cli(mut self, cli: ConfigLayer) -> Self {
        self.cli = cli;
        self
    }

    pub fn build(self) -> Settings {
        Settings::from_layer(self.user.merge(self.project).merge(self.cli))
    }
}

fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG))
        .find(|candidate| candidate.is_file())
}

/// Effective settings after merging all layers and applying defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: Option<String>,
    pub user: Option<String>,
    /// Upper-cased project key.
    pub project: Option<String>,
    pub editor: Option<String>,
    pub template: Option<String>,
    pub edit: bool,
    pub insecure: bool,
    pub max_results: u32,
    pub query_fields: String,
    pub sort: String,
    pub issuetype: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from_layer(ConfigLayer::default())
    }
}

impl Settings {
    pub fn from_layer(layer: ConfigLayer) -> Self {
        Settings {
            endpoint: layer
                .endpoint
                .map(|e| e.trim_end_matches('/').to_string())
                .filter(|e| !e.is_empty()),
            user: layer.user.filter(|u| !u.is_empty()),
            project: layer
                .project
                .map(|p| p.to_uppercase())
                .filter(|p| !p.is_empty()),
            editor: layer.editor,
            template: layer.template,
            edit: layer.edit.unwrap_or(true),
            insecure: layer.insecure.unwrap_or(false),
            max_results: layer.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            query_fields: layer
                .query_fields
                .unwrap_or_else(|| DEFAULT_QUERY_FIELDS.to_string()),
            sort: layer.sort.unwrap_or_else(|| DEFAULT_SORT.to_string()),
            issuetype: layer
                .issuetype
                .unwrap_or_else(|| DEFAULT_ISSUETYPE.to_string()),
        }
    }

    /// Browse URL for an issue key.
    pub fn browse_url(&self, key: &str) -> Option<String> {
        self.endpoint
            .as_ref()
            .map(|endpoint| format!("{}/browse/{}", endpoint, key))
    }
}

/// Locations under the per-user `.jira.d` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraPaths {
    home: PathBuf,
}

impl JiraPaths {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// `JIRA_HOME` if set, else `~/.jira.d`.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(home) = std::env::var("JIRA_HOME") {
            let trimmed = home.trim();
            if !trimmed.is_empty() {
                return Ok(Self::new(trimmed));
            }
        }
        dirs::home_dir()
            .map(|home| Self::new(home.join(".jira.d")))
            .ok_or(ConfigError::NoHome)
    }

    pub fn user_config(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn cookie_file(&self) -> PathBuf {
        self.home.join("cookies.js")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.home.join("tmp")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.home.join("templates")
    }
}
