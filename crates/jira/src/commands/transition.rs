//! Workflow transitions.

use super::*;
use crate::errors;

impl<B: HttpBackend> CommandExecutor<B> {
    fn fetch_transitions(&mut self, issue: &str) -> Result<Value> {
        self.get_json(&format!(
            "/rest/api/2/issue/{}/transitions?expand=transitions.fields",
            issue
        ))
    }

    /// Render the transitions available for an issue.
    pub fn transitions(&mut self, issue: &str) -> Result<String> {
        let transitions = self.fetch_transitions(issue)?;
        self.render("transitions", &TemplateContext::from_value(transitions))
    }

    /// Apply the transition called `name` (case-insensitive) to an issue.
    ///
    /// The chosen transition doubles as the template's `meta`, so only the
    /// fields that transition screen declares may be set.
    pub fn transition(
        &mut self,
        name: &str,
        issue: &str,
        comment: Option<&str>,
        overrides: &[(String, String)],
    ) -> Result<EditReport> {
        let data = self.get_json(&format!("/rest/api/2/issue/{}", issue))?;
        let transitions = self.fetch_transitions(issue)?;
        let available: Vec<&Value> = transitions
            .get("transitions")
            .and_then(Value::as_array)
            .map(|list| list.iter().collect())
            .unwrap_or_default();

        let chosen = available
            .iter()
            .find(|t| {
                t.get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .map(|t| (*t).clone());
        let Some(chosen) = chosen else {
            let names: Vec<String> = available
                .iter()
                .filter_map(|t| t.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            return Err(errors::unknown_transition(issue, name, &names).into());
        };

        let mut override_map = overrides_value(overrides);
        if let Some(comment) = comment {
            override_map.insert("comment".into(), Value::String(comment.to_string()));
        }
        let context = TemplateContext::from_value(data)
            .with("meta", chosen.clone())
            .with("transition", chosen)
            .with("overrides", Value::Object(override_map));

        let uri = self
            .client
            .url(&format!("/rest/api/2/issue/{}/transitions", issue));
        let editing = self.settings.edit && comment.is_none() && overrides.is_empty();
        let outcome = self.run_edit("transition", issue, editing, &context, |client, payload| {
            let response = client.post(&uri, payload)?;
            ensure_success(Method::Post, &uri, &response)?;
            Ok(())
        })?;
        Ok(EditReport {
            outcome,
            key: Some(issue.to_string()),
        })
    }
}
