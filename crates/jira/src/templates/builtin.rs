//! Built-in templates bundled with the binary.
//!
//! Every render context carries a `data` key holding the whole context, so
//! `debug`-style templates can dump it verbatim.

/// Dump the raw context as JSON.
pub const DEBUG: &str = r#"{{ data | tojson(indent=2) }}
"#;

pub const VIEW: &str = r#"issue: {{ key }}
status: {{ fields.status.name }}
summary: {{ fields.summary }}
project: {{ fields.project.key }}
components: {{ (fields.components or []) | map(attribute="name") | join(", ") }}
issuetype: {{ fields.issuetype.name }}
assignee: {{ fields.assignee.name if fields.assignee else "" }}
reporter: {{ fields.reporter.name if fields.reporter else "" }}
priority: {{ fields.priority.name if fields.priority else "" }}
created: {{ fields.created }}
updated: {{ fields.updated }}
description: |
  {{ fields.description | wrap(78) | indent(2) }}

comments:
{% for c in fields.comment.comments or [] %}
  - | # {{ c.author.name }} at {{ c.created }}
    {{ c.body | wrap(76) | indent(4) }}
{% endfor %}
"#;

pub const LIST: &str = r#"{% for issue in issues or [] %}
{{ issue.key }}: {{ issue.fields.summary }}
{% endfor %}
"#;

pub const EDIT: &str = r#"# issue: {{ key }}
update:
  comment:
    - add:
        body: |

fields:
  summary: {{ (fields.summary or "") | tojson }}
  components: # Values: {{ (meta.fields.components.allowedValues or []) | map(attribute="name") | join(", ") }}
{% for c in fields.components or [] %}
    - name: {{ c.name }}
{% endfor %}
  assignee:
    name: {{ fields.assignee.name if fields.assignee else "" }}
  reporter:
    name: {{ fields.reporter.name if fields.reporter else "" }}
  priority: # Values: {{ (meta.fields.priority.allowedValues or []) | map(attribute="name") | join(", ") }}
    name: {{ fields.priority.name if fields.priority else "" }}
  labels:
{% for label in fields.labels or [] %}
    - {{ label | tojson }}
{% endfor %}
  description: |
    {{ (fields.description or "") | indent(4) }}
"#;

pub const CREATE: &str = r#"fields:
  project:
    key: {{ overrides.project }}
  issuetype:
    name: {{ overrides.issuetype }}
  summary: {{ (overrides.summary or "") | tojson }}
  priority: # Values: {{ (meta.fields.priority.allowedValues or []) | map(attribute="name") | join(", ") }}
    name: {{ overrides.priority or "" }}
  components: # Values: {{ (meta.fields.components.allowedValues or []) | map(attribute="name") | join(", ") }}
    - name: {{ overrides.components or "" }}
  description: |
    {{ (overrides.description or "") | indent(4) }}
  assignee:
    name: {{ overrides.assignee or "" }}
{% if overrides.reporter %}
  reporter:
    name: {{ overrides.reporter }}
{% endif %}
"#;

pub const COMMENT: &str = r#"body: |
  {{ (overrides.comment or "") | indent(2) }}
"#;

pub const TRANSITION: &str = r#"# issue: {{ key }} -> {{ transition.name }}
update:
  comment:
    - add:
        body: |
          {{ (overrides.comment or "") | indent(10) }}
fields:
{% if meta.fields.assignee %}
  assignee:
    name: {{ overrides.assignee or (fields.assignee.name if fields.assignee else "") }}
{% endif %}
{% if meta.fields.resolution %}
  resolution: # Values: {{ (meta.fields.resolution.allowedValues or []) | map(attribute="name") | join(", ") }}
    name: {{ overrides.resolution or "" }}
{% endif %}
transition:
  id: {{ transition.id | tojson }}
"#;

pub const TRANSITIONS: &str = r#"{% for t in transitions or [] %}
{{ t.id }}: {{ t.name }}
{% endfor %}
"#;

/// Names of all built-in templates, in export order.
pub const NAMES: &[&str] = &[
    "debug",
    "view",
    "list",
    "edit",
    "create",
    "comment",
    "transition",
    "transitions",
    "editmeta",
    "createmeta",
    "fields",
];

/// Look up a built-in template by name.
pub fn get(name: &str) -> Option<&'static str> {
    match name {
        "debug" | "editmeta" | "createmeta" | "fields" => Some(DEBUG),
        "view" => Some(VIEW),
        "list" => Some(LIST),
        "edit" => Some(EDIT),
        "create" => Some(CREATE),
        "comment" => Some(COMMENT),
        "transition" => Some(TRANSITION),
        "transitions" => Some(TRANSITIONS),
        _ => None,
    }
}

/// All built-in templates as `(name, text)` pairs.
pub fn all() -> Vec<(&'static str, &'static str)> {
    NAMES
        .iter()
        .filter_map(|name| get(name).map(|text| (*name, text)))
        .collect()
}
