//! The edit/retry session.
//!
//! A session renders a template into a scratch file, lets the user edit it,
//! parses and validates the result, and hands the JSON payload to a submit
//! callback. Failures while editing are interactive: the user is offered
//! another round in the editor. With editing disabled every failure is final.
//!
//! Scratch files live in the configured tmp dir and are removed however the
//! session ends.

pub mod document;
pub mod editor;
pub mod prompt;

pub use document::{DocumentError, EditedDocument};
pub use editor::{resolve_editor, CommandEditor, Editor, EditorError, FnEditor};
pub use prompt::{Prompter, ScriptedPrompter, TerminalPrompter};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::templates::{self, TemplateContext, TemplateError};
use crate::validation::{self, ValidationError};

const EDIT_AGAIN: &str = "Editing failed, edit again?";

#[derive(Debug, Clone)]
pub struct EditOptions {
    /// Open the editor. When false the rendered template is submitted as is.
    pub editing: bool,
    /// Directory for scratch files.
    pub tmp_dir: PathBuf,
    /// Scratch file name prefix, usually the issue key or operation.
    pub file_prefix: String,
}

impl EditOptions {
    pub fn new(editing: bool, tmp_dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            editing,
            tmp_dir: tmp_dir.into(),
            file_prefix: file_prefix.into(),
        }
    }
}

/// How a session that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Submitted,
    /// The editor exited without touching the file.
    NoChanges,
    /// The document carried `abort: true`.
    Aborted,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Render(#[from] TemplateError),
    #[error("Failed to prepare scratch file in {dir}: {source}")]
    Scratch {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Parse(#[from] DocumentError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0:#}")]
    Submit(anyhow::Error),
}

/// Working copy plus an untouched copy of the rendered template.
/// Both files are deleted on drop.
struct ScratchFiles {
    working: TempPath,
    pristine: TempPath,
}

impl ScratchFiles {
    fn create(dir: &Path, prefix: &str, contents: &str) -> Result<Self, EditError> {
        let scratch_err = |source| EditError::Scratch {
            dir: dir.to_path_buf(),
            source,
        };
        fs::create_dir_all(dir).map_err(scratch_err)?;
        let working = write_temp(dir, prefix, ".yml", contents).map_err(scratch_err)?;
        let pristine = write_temp(dir, prefix, ".yml.orig", contents).map_err(scratch_err)?;
        debug!("Scratch file {}", working.display());
        Ok(Self { working, pristine })
    }

    fn working(&self) -> &Path {
        &self.working
    }

    fn unchanged(&self) -> bool {
        match (fs::read(&self.working), fs::read(&self.pristine)) {
            (Ok(edited), Ok(original)) => edited == original,
            _ => false,
        }
    }
}

fn write_temp(dir: &Path, prefix: &str, suffix: &str, contents: &str) -> io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("{}-", prefix))
        .suffix(suffix)
        .tempfile_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

enum EditStep {
    Changed,
    Unchanged,
    Again,
}

/// One template-driven edit of a Jira resource.
pub struct EditSession<'a> {
    options: EditOptions,
    editor: &'a dyn Editor,
    prompter: &'a mut dyn Prompter,
}

impl<'a> EditSession<'a> {
    pub fn new(
        options: EditOptions,
        editor: &'a dyn Editor,
        prompter: &'a mut dyn Prompter,
    ) -> Self {
        Self {
            options,
            editor,
            prompter,
        }
    }

    /// Run the session to completion.
    ///
    /// `submit` receives the JSON payload and is called at most once. A
    /// submit failure always ends the session with [`EditError::Submit`].
    pub fn run<F>(
        &mut self,
        template: &str,
        context: &TemplateContext,
        mut submit: F,
    ) -> Result<EditOutcome, EditError>
    where
        F: FnMut(&str) -> anyhow::Result<()>,
    {
        let rendered = templates::render(template, context)?;
        let scratch = ScratchFiles::create(
            &self.options.tmp_dir,
            &self.options.file_prefix,
            &rendered,
        )?;
        let allowed = context.allowed_fields();

        loop {
            if self.options.editing {
                match self.edit(&scratch)? {
                    EditStep::Again => continue,
                    EditStep::Unchanged => {
                        info!("No changes made, aborting");
                        return Ok(EditOutcome::NoChanges);
                    }
                    EditStep::Changed => {}
                }
            }

            let document = match read_document(scratch.working()) {
                Ok(document) => document,
                Err(err) => {
                    self.retry_or_fail(err)?;
                    continue;
                }
            };

            if document.is_abort() {
                info!("abort flag found in template, quitting");
                return Ok(EditOutcome::Aborted);
            }

            if let Err(err) = validation::validate_fields(document.as_map(), allowed.as_ref()) {
                self.retry_or_fail(err.into())?;
                continue;
            }

            let payload = document.to_payload()?;
            debug!("Submitting {}", payload);
            return match submit(&payload) {
                Ok(()) => Ok(EditOutcome::Submitted),
                Err(err) => {
                    error!("{:#}", err);
                    if self.options.editing {
                        // A failed submit is final whatever the answer.
                        let _ = self.prompter.confirm(EDIT_AGAIN, true);
                    }
                    Err(EditError::Submit(err))
                }
            };
        }
    }

    fn edit(&mut self, scratch: &ScratchFiles) -> Result<EditStep, EditError> {
        if let Err(err) = self.editor.edit(scratch.working()) {
            error!("{}", err);
            if self.prompter.confirm(EDIT_AGAIN, true) {
                return Ok(EditStep::Again);
            }
            return Err(err.into());
        }
        if scratch.unchanged() {
            Ok(EditStep::Unchanged)
        } else {
            Ok(EditStep::Changed)
        }
    }

    fn retry_or_fail(&mut self, err: EditError) -> Result<(), EditError> {
        error!("{}", err);
        if self.options.editing && self.prompter.confirm(EDIT_AGAIN, true) {
            Ok(())
        } else {
            Err(err)
        }
    }
}

fn read_document(path: &Path) -> Result<EditedDocument, EditError> {
    let text = fs::read_to_string(path).map_err(|source| EditError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(EditedDocument::parse(&text)?)
}
