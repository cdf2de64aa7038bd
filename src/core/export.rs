use crate::config::{ExportFormatEntry, RecordsUiConfig};
use crate::core::registry::Capabilities;
use crate::core::ui::RecordsUi;
use crate::core::view::{abort, template_context, RecordView, ViewContext};
use crate::domain::model::Response;
use crate::domain::ports::Serializer;
use crate::utils::error::{ErrorKind, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

#[derive(Clone)]
pub struct ExportFormat {
    pub slug: String,
    pub title: String,
    pub serializer: Arc<dyn Serializer>,
    pub order: i64,
}

#[derive(Clone, Default)]
pub struct ExportFormats {
    formats: Vec<ExportFormat>,
    retired: BTreeSet<String>,
}

pub enum FormatLookup<'a> {
    Found(&'a ExportFormat),
    Retired,
    Unknown,
}

impl ExportFormats {
    pub fn lookup(&self, slug: &str) -> FormatLookup<'_> {
        if let Some(format) = self.formats.iter().find(|f| f.slug == slug) {
            FormatLookup::Found(format)
        } else if self.retired.contains(slug) {
            FormatLookup::Retired
        } else {
            FormatLookup::Unknown
        }
    }

    /// Active formats by `order`, then slug.
    pub fn iter(&self) -> impl Iterator<Item = &ExportFormat> {
        self.formats.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

/// Export formats per pid type. Serializer names are checked when the
/// registry is built; the sorted list for a pid type is assembled on first
/// use and kept for the lifetime of the process.
pub struct ExportRegistry {
    entries: BTreeMap<String, BTreeMap<String, ExportFormatEntry>>,
    serializers: HashMap<String, Arc<dyn Serializer>>,
    cache: HashMap<String, OnceLock<Arc<ExportFormats>>>,
}

impl ExportRegistry {
    pub fn new(config: &RecordsUiConfig, capabilities: &Capabilities) -> Result<Self> {
        let mut serializers = HashMap::new();
        for formats in config.export_formats.values() {
            for entry in formats.values() {
                if let ExportFormatEntry::Format(format) = entry {
                    if !serializers.contains_key(&format.serializer) {
                        serializers.insert(
                            format.serializer.clone(),
                            capabilities.serializer(&format.serializer)?,
                        );
                    }
                }
            }
        }

        let cache = config
            .export_formats
            .keys()
            .map(|pid_type| (pid_type.clone(), OnceLock::new()))
            .collect();

        Ok(Self {
            entries: config.export_formats.clone(),
            serializers,
            cache,
        })
    }

    pub fn formats(&self, pid_type: &str) -> Arc<ExportFormats> {
        match self.cache.get(pid_type) {
            Some(cell) => cell.get_or_init(|| Arc::new(self.assemble(pid_type))).clone(),
            None => Arc::new(ExportFormats::default()),
        }
    }

    fn assemble(&self, pid_type: &str) -> ExportFormats {
        let mut result = ExportFormats::default();
        let Some(entries) = self.entries.get(pid_type) else {
            return result;
        };

        for (slug, entry) in entries {
            match entry {
                ExportFormatEntry::Retired(_) => {
                    result.retired.insert(slug.clone());
                }
                ExportFormatEntry::Format(format) => {
                    // Present: checked in `new`.
                    if let Some(serializer) = self.serializers.get(&format.serializer) {
                        result.formats.push(ExportFormat {
                            slug: slug.clone(),
                            title: format.title.clone(),
                            serializer: serializer.clone(),
                            order: format.order,
                        });
                    }
                }
            }
        }

        result
            .formats
            .sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.slug.cmp(&b.slug)));
        tracing::debug!(pid_type, formats = result.formats.len(), "assembled export formats");
        result
    }
}

/// Serializes the record in the format named by the `format` URL parameter.
pub struct ExportView;

#[async_trait]
impl RecordView for ExportView {
    async fn render(&self, ui: &RecordsUi, ctx: ViewContext<'_>) -> Result<Response> {
        let slug = ctx.params.get("format").map(String::as_str).unwrap_or_default();
        let formats = ui.export_formats(&ctx.pid.pid_type);

        let format = match formats.lookup(slug) {
            FormatLookup::Found(format) => format,
            FormatLookup::Retired => return Ok(abort(ErrorKind::Gone)),
            FormatLookup::Unknown => return Ok(abort(ErrorKind::NotFound)),
        };

        let data = format.serializer.serialize(ctx.pid, ctx.record)?.into_text()?;

        let mut context = template_context(ctx.pid, ctx.record)?;
        context.insert("data".to_string(), Value::String(data));
        context.insert("format_title".to_string(), Value::String(format.title.clone()));

        let body = ui.templates().render(ctx.template, &Value::Object(context))?;
        Ok(Response::ok(body))
    }
}
