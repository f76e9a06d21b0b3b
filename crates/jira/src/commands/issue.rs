//! Issue reads, edits, creation and comments.

use super::*;
use crate::cli::{CreateArgs, ListArgs};
use crate::errors::{self, ActionableError};
use crate::output::ExitCode;
use anyhow::anyhow;
use serde_json::json;

/// Build the JQL for `list`.
///
/// A raw `--query` wins. Otherwise unresolved issues of the project are
/// selected, narrowed by each filter given.
pub fn build_jql(args: &ListArgs, settings: &Settings) -> Result<String, ActionableError> {
    if let Some(query) = &args.query {
        return Ok(query.clone());
    }
    let project = args
        .project
        .as_deref()
        .map(str::to_uppercase)
        .or_else(|| settings.project.clone())
        .ok_or_else(|| {
            ActionableError::new("No --query or --project given for list")
                .with_remedy("Pass --query 'JQL' or --project KEY")
                .with_exit_code(ExitCode::InvalidArgument)
        })?;

    let mut clauses = vec![
        "resolution = unresolved".to_string(),
        format!("project = '{}'", project),
    ];
    let filters = [
        ("component", &args.component),
        ("assignee", &args.assignee),
        ("issuetype", &args.issuetype),
        ("watcher", &args.watcher),
        ("reporter", &args.reporter),
    ];
    for (field, value) in filters {
        if let Some(value) = value {
            clauses.push(format!("{} = '{}'", field, value));
        }
    }
    let sort = args.sort.as_deref().unwrap_or(&settings.sort);
    Ok(format!("{} ORDER BY {}", clauses.join(" AND "), sort))
}

impl<B: HttpBackend> CommandExecutor<B> {
    /// Search issues and render the `list` template.
    pub fn list(&mut self, args: &ListArgs) -> Result<String> {
        let jql = build_jql(args, &self.settings)?;
        let max_results = args.max_results.unwrap_or(self.settings.max_results);
        let fields: Vec<String> = args
            .query_fields
            .as_deref()
            .unwrap_or(&self.settings.query_fields)
            .split(',')
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        let body = json!({
            "jql": jql,
            "startAt": "0",
            "maxResults": max_results,
            "fields": fields,
        })
        .to_string();

        let uri = self.client.url("/rest/api/2/search");
        let response = self.client.post(&uri, &body)?;
        ensure_success(Method::Post, &uri, &response)?;
        let results = decode(&uri, &response)?;
        self.render("list", &TemplateContext::from_value(results))
    }

    /// Fetch an issue and render the `view` template.
    pub fn view(&mut self, issue: &str) -> Result<String> {
        let data = self.get_json(&format!("/rest/api/2/issue/{}", issue))?;
        self.render("view", &TemplateContext::from_value(data))
    }

    /// Edit an issue against its edit metadata.
    pub fn edit(&mut self, issue: &str) -> Result<EditReport> {
        let data = self.get_json(&format!("/rest/api/2/issue/{}", issue))?;
        let meta = self.get_json(&format!("/rest/api/2/issue/{}/editmeta", issue))?;
        let context = TemplateContext::from_value(data).with("meta", meta);

        let uri = self.client.url(&format!("/rest/api/2/issue/{}", issue));
        let editing = self.settings.edit;
        let outcome = self.run_edit("edit", issue, editing, &context, |client, payload| {
            let response = client.put(&uri, payload)?;
            ensure_success(Method::Put, &uri, &response)?;
            Ok(())
        })?;
        Ok(EditReport {
            outcome,
            key: Some(issue.to_string()),
        })
    }

    /// Create an issue from the `create-<issuetype>` template.
    pub fn create(&mut self, args: &CreateArgs) -> Result<EditReport> {
        let project = args
            .project
            .as_deref()
            .map(str::to_uppercase)
            .or_else(|| self.settings.project.clone())
            .ok_or_else(errors::missing_project)?;
        let issuetype = args
            .issuetype
            .clone()
            .unwrap_or_else(|| self.settings.issuetype.clone());

        let meta = self.create_meta(&project, &issuetype)?;

        let mut overrides = Map::new();
        overrides.insert("project".into(), Value::String(project.clone()));
        overrides.insert("issuetype".into(), Value::String(issuetype.clone()));
        if let Some(user) = &self.settings.user {
            overrides.insert("user".into(), Value::String(user.clone()));
        }
        overrides.extend(overrides_value(&args.overrides));
        let context = TemplateContext::new()
            .with("meta", meta)
            .with("overrides", Value::Object(overrides));

        let template_name = format!("create-{}", issuetype.to_lowercase().replace(' ', "-"));
        let uri = self.client.url("/rest/api/2/issue");
        let editing = self.settings.edit;
        let mut created = None;
        let outcome = self.run_edit(
            &template_name,
            &format!("create-{}", project),
            editing,
            &context,
            |client, payload| {
                let response = client.post(&uri, payload)?;
                ensure_success(Method::Post, &uri, &response)?;
                let body = decode(&uri, &response)?;
                created = body.get("key").and_then(Value::as_str).map(str::to_string);
                Ok(())
            },
        )?;
        Ok(EditReport {
            outcome,
            key: created,
        })
    }

    /// The issue-type entry of the create metadata, which carries `fields`.
    fn create_meta(&mut self, project: &str, issuetype: &str) -> Result<Value> {
        let meta = self.get_json_with_query(
            "/rest/api/2/issue/createmeta",
            &[
                ("projectKeys", project),
                ("issuetypeNames", issuetype),
                ("expand", "projects.issuetypes.fields"),
            ],
        )?;
        meta.pointer("/projects/0/issuetypes/0")
            .cloned()
            .ok_or_else(|| {
                ActionableError::new(format!(
                    "No create metadata for issue type '{}' in project {}",
                    issuetype, project
                ))
                .with_cause("The project key or issue type name may be wrong")
                .with_cause("You may not have permission to create issues in this project")
                .with_remedy(format!("Inspect what is available: jira createmeta -p {}", project))
                .with_exit_code(ExitCode::NotFound)
                .into()
            })
    }

    /// Add a comment. With `text` the editor is skipped.
    pub fn comment(&mut self, issue: &str, text: Option<&str>) -> Result<EditReport> {
        let mut overrides = Map::new();
        if let Some(text) = text {
            overrides.insert("comment".into(), Value::String(text.to_string()));
        }
        let context = TemplateContext::new()
            .with("key", Value::String(issue.to_string()))
            .with("overrides", Value::Object(overrides));

        let uri = self
            .client
            .url(&format!("/rest/api/2/issue/{}/comment", issue));
        let editing = self.settings.edit && text.is_none();
        let outcome = self.run_edit("comment", issue, editing, &context, |client, payload| {
            let response = client.post(&uri, payload)?;
            ensure_success(Method::Post, &uri, &response)?;
            Ok(())
        })?;
        Ok(EditReport {
            outcome,
            key: Some(issue.to_string()),
        })
    }

    pub fn editmeta(&mut self, issue: &str) -> Result<String> {
        let meta = self.get_json(&format!("/rest/api/2/issue/{}/editmeta", issue))?;
        self.render("editmeta", &TemplateContext::from_value(meta))
    }

    pub fn createmeta(&mut self, project: Option<&str>, issuetype: Option<&str>) -> Result<String> {
        let project = project
            .map(str::to_uppercase)
            .or_else(|| self.settings.project.clone())
            .ok_or_else(errors::missing_project)?;
        let mut query = vec![
            ("projectKeys", project.as_str()),
            ("expand", "projects.issuetypes.fields"),
        ];
        if let Some(issuetype) = issuetype {
            query.push(("issuetypeNames", issuetype));
        }
        let meta = self.get_json_with_query("/rest/api/2/issue/createmeta", &query)?;
        if meta.pointer("/projects/0").is_none() {
            return Err(anyhow!("No create metadata for project {}", project));
        }
        self.render("createmeta", &TemplateContext::from_value(meta))
    }

    pub fn fields(&mut self) -> Result<String> {
        let fields = self.get_json("/rest/api/2/field")?;
        self.render("fields", &TemplateContext::from_value(fields))
    }
}
