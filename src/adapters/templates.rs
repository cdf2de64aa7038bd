//! Minimal template engine: `{{ dotted.path }}` lookups into a JSON context.
//!
//! Values are HTML-escaped unless written as `{{ name|safe }}`. Missing keys
//! render as an empty string. Every page is wrapped in the base template
//! through its `{{ body|safe }}` slot.

use crate::domain::ports::TemplateEngine;
use crate::utils::error::{RecordsUiError, Result};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use walkdir::WalkDir;

pub const BASE_TEMPLATE: &str = "records_ui/base.html";
pub const DETAIL_TEMPLATE: &str = "records_ui/detail.html";
pub const TOMBSTONE_TEMPLATE: &str = "records_ui/tombstone.html";
pub const EXPORT_TEMPLATE: &str = "records_ui/export.html";

const BASE_SOURCE: &str = r#"<!DOCTYPE html>
<html>
<head><title>{{ record.title }}</title></head>
<body>
{{ body|safe }}
</body>
</html>
"#;

const DETAIL_SOURCE: &str = r#"<h1>{{ record.title }}</h1>
<p class="pid">{{ pid.pid_type }}: {{ pid.pid_value }}</p>
<pre>{{ record }}</pre>
"#;

const TOMBSTONE_SOURCE: &str = r#"<h1>Gone</h1>
<p>The record {{ pid.pid_type }}:{{ pid.pid_value }} has been removed.</p>
"#;

const EXPORT_SOURCE: &str = r#"<h1>{{ record.title }}</h1>
<h2>Export ({{ format_title }})</h2>
<pre>{{ data }}</pre>
"#;

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*(\|\s*safe\s*)?\}\}")
            .expect("template tag regex is valid")
    })
}

pub struct TemplateRegistry {
    templates: HashMap<String, String>,
    base_template: Option<String>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    /// Registry preloaded with the built-in templates, wrapped in the built-in base.
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        templates.insert(BASE_TEMPLATE.to_string(), BASE_SOURCE.to_string());
        templates.insert(DETAIL_TEMPLATE.to_string(), DETAIL_SOURCE.to_string());
        templates.insert(TOMBSTONE_TEMPLATE.to_string(), TOMBSTONE_SOURCE.to_string());
        templates.insert(EXPORT_TEMPLATE.to_string(), EXPORT_SOURCE.to_string());

        Self {
            templates,
            base_template: Some(BASE_TEMPLATE.to_string()),
        }
    }

    pub fn with_template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(name.into(), source.into());
        self
    }

    /// `None` renders pages bare.
    pub fn with_base_template(mut self, name: Option<String>) -> Self {
        self.base_template = name;
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Loads every `*.html` below `dir`, named by its `/`-separated relative path.
    pub fn load_dir<P: AsRef<Path>>(mut self, dir: P) -> Result<Self> {
        let root = dir.as_ref();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| RecordsUiError::ConfigError {
                message: format!("template dir {}: {}", root.display(), e),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("html")
            {
                continue;
            }

            let name = path
                .strip_prefix(root)
                .map_err(|e| RecordsUiError::ConfigError {
                    message: format!("template path {}: {}", path.display(), e),
                })?
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let source = std::fs::read_to_string(path)?;
            tracing::debug!(template = %name, "loaded template");
            self.templates.insert(name, source);
        }

        Ok(self)
    }

    fn render_source(&self, name: &str, context: &Value) -> Result<String> {
        let source = self
            .templates
            .get(name)
            .ok_or_else(|| RecordsUiError::TemplateError {
                template: name.to_string(),
                message: "template not found".to_string(),
            })?;

        Ok(tag_regex()
            .replace_all(source, |caps: &Captures| {
                let text = lookup(context, &caps[1]).map(stringify).unwrap_or_default();
                if caps.get(2).is_some() {
                    text
                } else {
                    escape_html(&text)
                }
            })
            .into_owned())
    }
}

impl TemplateEngine for TemplateRegistry {
    fn render(&self, template: &str, context: &Value) -> Result<String> {
        let body = self.render_source(template, context)?;

        match self.base_template.as_deref() {
            Some(base) if base != template => {
                let mut wrapped = context.clone();
                if let Value::Object(map) = &mut wrapped {
                    map.insert("body".to_string(), Value::String(body));
                } else {
                    wrapped = serde_json::json!({ "body": body });
                }
                self.render_source(base, &wrapped)
            }
            _ => Ok(body),
        }
    }
}

fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
