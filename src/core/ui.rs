use crate::adapters::templates::TemplateRegistry;
use crate::config::RecordsUiConfig;
use crate::core::export::{ExportFormats, ExportRegistry};
use crate::core::registry::{Capabilities, Endpoint, EndpointRegistry};
use crate::core::routing::Router;
use crate::core::signals::RecordViewedSignal;
use crate::core::view::{record_view, template_context};
use crate::domain::model::{PersistentIdentifier, Record, RecordViewed, Request, Response};
use crate::domain::ports::{PermissionRule, PidStore, TemplateEngine};
use crate::utils::error::{ErrorKind, Result};
use crate::utils::validation::Validate;
use serde_json::Value;
use std::sync::Arc;

/// Application context for the records UI: built once at startup and shared
/// by reference with every request.
pub struct RecordsUi {
    registry: EndpointRegistry,
    exports: ExportRegistry,
    templates: Arc<dyn TemplateEngine>,
    record_viewed: RecordViewedSignal,
    default_permission: Option<PermissionRule>,
    tombstone_template: String,
    login_endpoint: String,
}

pub struct RecordsUiBuilder {
    config: RecordsUiConfig,
    capabilities: Capabilities,
    store: Arc<dyn PidStore>,
    templates: Option<Arc<dyn TemplateEngine>>,
    record_viewed: RecordViewedSignal,
}

impl RecordsUiBuilder {
    pub fn new(
        config: RecordsUiConfig,
        capabilities: Capabilities,
        store: Arc<dyn PidStore>,
    ) -> Self {
        Self {
            config,
            capabilities,
            store,
            templates: None,
            record_viewed: RecordViewedSignal::new(),
        }
    }

    /// Replaces the built-in template engine (and `template_dir`).
    pub fn templates(mut self, templates: Arc<dyn TemplateEngine>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn on_record_viewed<F>(mut self, subscriber: F) -> Self
    where
        F: Fn(&RecordViewed) + Send + Sync + 'static,
    {
        self.record_viewed.connect(subscriber);
        self
    }

    pub fn build(self) -> Result<RecordsUi> {
        self.config.validate()?;

        let registry = EndpointRegistry::build(&self.config, &self.capabilities, self.store)?;
        let exports = ExportRegistry::new(&self.config, &self.capabilities)?;
        let default_permission = self
            .config
            .default_permission
            .as_deref()
            .map(|name| self.capabilities.permission(name))
            .transpose()?;

        let templates = match self.templates {
            Some(templates) => templates,
            None => {
                let mut engine =
                    TemplateRegistry::new()
                        .with_base_template(Some(self.config.base_template.clone()));
                if let Some(dir) = &self.config.template_dir {
                    engine = engine.load_dir(dir)?;
                }
                Arc::new(engine)
            }
        };

        if !registry.router().contains(&self.config.login_endpoint) {
            tracing::warn!(
                login_endpoint = %self.config.login_endpoint,
                "login endpoint has no route; denied anonymous requests will fail"
            );
        }

        tracing::info!(
            endpoints = registry.len(),
            subscribers = self.record_viewed.receiver_count(),
            "records UI initialised"
        );

        Ok(RecordsUi {
            registry,
            exports,
            templates,
            record_viewed: self.record_viewed,
            default_permission,
            tombstone_template: self.config.tombstone_template,
            login_endpoint: self.config.login_endpoint,
        })
    }
}

impl RecordsUi {
    pub fn builder(
        config: RecordsUiConfig,
        capabilities: Capabilities,
        store: Arc<dyn PidStore>,
    ) -> RecordsUiBuilder {
        RecordsUiBuilder::new(config, capabilities, store)
    }

    /// Entry point for one request.
    ///
    /// Every resolution outcome comes back as `Ok` with its status; `Err` is
    /// reserved for failing collaborators (store, templates, serializers) and
    /// for an unroutable login endpoint.
    pub async fn handle(&self, request: &Request) -> Result<Response> {
        let Some((name, params)) = self.registry.router().match_path(&request.path) else {
            tracing::debug!(path = %request.path, "no records endpoint matches");
            return Ok(Response::status(ErrorKind::NotFound.status_code()));
        };

        let Some(endpoint) = self.registry.get(name) else {
            return Ok(Response::status(ErrorKind::NotFound.status_code()));
        };

        if !endpoint.allows(&request.method) {
            tracing::debug!(
                endpoint = %endpoint.name,
                method = %request.method,
                "method not allowed"
            );
            return Ok(Response::status(405));
        }

        record_view(self, endpoint, request, &params).await
    }

    /// Renders the tombstone page for a deleted identifier.
    pub fn tombstone(
        &self,
        pid: &PersistentIdentifier,
        record: Option<&Record>,
    ) -> Result<Response> {
        let empty = Record::empty();
        let context = template_context(pid, record.unwrap_or(&empty))?;
        let body = self
            .templates
            .render(&self.tombstone_template, &Value::Object(context))?;
        tracing::debug!(pid = %pid, "rendered tombstone");
        Ok(Response::html(ErrorKind::Gone.status_code(), body))
    }

    pub fn default_permission(&self) -> Option<&PermissionRule> {
        self.default_permission.as_ref()
    }

    pub fn export_formats(&self, pid_type: &str) -> Arc<ExportFormats> {
        self.exports.formats(pid_type)
    }

    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.registry.get(name)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.registry.endpoints()
    }

    pub fn router(&self) -> &Router {
        self.registry.router()
    }

    pub fn templates(&self) -> &dyn TemplateEngine {
        self.templates.as_ref()
    }

    pub fn record_viewed(&self) -> &RecordViewedSignal {
        &self.record_viewed
    }

    pub fn login_endpoint(&self) -> &str {
        &self.login_endpoint
    }
}
