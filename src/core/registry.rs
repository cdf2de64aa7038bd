//! Endpoint registry: turns endpoint descriptors into routable endpoints.
//!
//! Names in the configuration (permission rules, views, record accessors,
//! serializers) are looked up in [`Capabilities`] once, when the registry is
//! built. An unknown name fails startup instead of the first request.

use crate::adapters::serializers::{CsvSerializer, JsonSerializer};
use crate::adapters::templates::DETAIL_TEMPLATE;
use crate::config::{EndpointConfig, RecordsUiConfig};
use crate::core::export::ExportView;
use crate::core::resolver::Resolver;
use crate::core::routing::{RoutePattern, Router};
use crate::core::view::{DefaultView, RecordView};
use crate::domain::model::{Caller, Record};
use crate::domain::ports::{PermissionRule, PidResolver, PidStore, RecordAccessor, Serializer};
use crate::utils::error::{RecordsUiError, Result};
use crate::utils::validation;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub const DEFAULT_VIEW: &str = "default";
pub const EXPORT_VIEW: &str = "export";
pub const DEFAULT_RECORD_ACCESSOR: &str = "default";

#[derive(Clone)]
pub struct Capabilities {
    permissions: HashMap<String, PermissionRule>,
    views: HashMap<String, Arc<dyn RecordView>>,
    record_accessors: HashMap<String, Arc<dyn RecordAccessor>>,
    serializers: HashMap<String, Arc<dyn Serializer>>,
}

impl Capabilities {
    /// Built-ins plus `default_accessor` registered as the `default` record accessor.
    pub fn new(default_accessor: Arc<dyn RecordAccessor>) -> Self {
        let mut capabilities = Self {
            permissions: HashMap::new(),
            views: HashMap::new(),
            record_accessors: HashMap::new(),
            serializers: HashMap::new(),
        };

        capabilities
            .record_accessors
            .insert(DEFAULT_RECORD_ACCESSOR.to_string(), default_accessor);
        capabilities
            .views
            .insert(DEFAULT_VIEW.to_string(), Arc::new(DefaultView));
        capabilities
            .views
            .insert(EXPORT_VIEW.to_string(), Arc::new(ExportView));
        capabilities
            .serializers
            .insert("json".to_string(), Arc::new(JsonSerializer));
        capabilities
            .serializers
            .insert("csv".to_string(), Arc::new(CsvSerializer));

        capabilities
            .with_permission("authenticated", |_: &Record, caller: &Caller| {
                caller.is_authenticated()
            })
            .with_permission("open_access", |record: &Record, _: &Caller| {
                record.get_str("access") == Some("open")
            })
    }

    pub fn with_permission<F>(mut self, name: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&Record, &Caller) -> bool + Send + Sync + 'static,
    {
        self.permissions.insert(name.into(), Arc::new(rule));
        self
    }

    pub fn with_view(mut self, name: impl Into<String>, view: Arc<dyn RecordView>) -> Self {
        self.views.insert(name.into(), view);
        self
    }

    pub fn with_record_accessor(
        mut self,
        name: impl Into<String>,
        accessor: Arc<dyn RecordAccessor>,
    ) -> Self {
        self.record_accessors.insert(name.into(), accessor);
        self
    }

    pub fn with_serializer(
        mut self,
        name: impl Into<String>,
        serializer: Arc<dyn Serializer>,
    ) -> Self {
        self.serializers.insert(name.into(), serializer);
        self
    }

    pub fn permission(&self, name: &str) -> Result<PermissionRule> {
        lookup(&self.permissions, "permission rule", name)
    }

    pub fn view(&self, name: &str) -> Result<Arc<dyn RecordView>> {
        lookup(&self.views, "view", name)
    }

    pub fn record_accessor(&self, name: &str) -> Result<Arc<dyn RecordAccessor>> {
        lookup(&self.record_accessors, "record accessor", name)
    }

    pub fn serializer(&self, name: &str) -> Result<Arc<dyn Serializer>> {
        lookup(&self.serializers, "serializer", name)
    }
}

fn lookup<T: Clone>(map: &HashMap<String, T>, kind: &'static str, name: &str) -> Result<T> {
    map.get(name)
        .cloned()
        .ok_or_else(|| RecordsUiError::UnknownCapability {
            kind,
            name: name.to_string(),
        })
}

/// One routable records endpoint with everything resolved.
pub struct Endpoint {
    pub name: String,
    pub pid_type: String,
    pub route: RoutePattern,
    pub template: String,
    pub permission: Option<PermissionRule>,
    pub view: Arc<dyn RecordView>,
    pub resolver: Arc<dyn PidResolver>,
    pub methods: BTreeSet<String>,
}

impl Endpoint {
    pub fn allows(&self, method: &str) -> bool {
        self.methods.contains(&method.to_ascii_uppercase())
    }
}

pub struct EndpointRegistry {
    endpoints: HashMap<String, Endpoint>,
    router: Router,
}

impl EndpointRegistry {
    pub fn build(
        config: &RecordsUiConfig,
        capabilities: &Capabilities,
        store: Arc<dyn PidStore>,
    ) -> Result<Self> {
        let mut endpoints = HashMap::new();
        let mut router = Router::new();

        for (name, descriptor) in &config.endpoints {
            let endpoint = Self::create_endpoint(name, descriptor, capabilities, store.clone())?;
            router.add(name, endpoint.route.clone())?;
            tracing::debug!(
                endpoint = %name,
                pid_type = %endpoint.pid_type,
                route = endpoint.route.rule(),
                "registered records endpoint"
            );
            endpoints.insert(name.clone(), endpoint);
        }

        for (name, rule) in &config.host_routes {
            router.add_host_route(name, rule)?;
        }

        Ok(Self { endpoints, router })
    }

    /// Validates one descriptor and applies the defaults for unset fields.
    pub fn create_endpoint(
        name: &str,
        descriptor: &EndpointConfig,
        capabilities: &Capabilities,
        store: Arc<dyn PidStore>,
    ) -> Result<Endpoint> {
        validation::validate_non_empty_string(
            &format!("endpoints.{}.pid_type", name),
            &descriptor.pid_type,
        )?;
        validation::validate_route(&format!("endpoints.{}.route", name), &descriptor.route)?;
        validation::validate_methods(&format!("endpoints.{}.methods", name), &descriptor.methods)?;

        let route = RoutePattern::parse(&descriptor.route)?;
        if !route.param_names().any(|p| p == "pid_value") {
            return Err(RecordsUiError::InvalidConfigValueError {
                field: format!("endpoints.{}.route", name),
                value: descriptor.route.clone(),
                reason: "Route must include the <pid_value> placeholder".to_string(),
            });
        }

        let permission = descriptor
            .permission
            .as_deref()
            .map(|p| capabilities.permission(p))
            .transpose()?;
        let view = capabilities.view(descriptor.view.as_deref().unwrap_or(DEFAULT_VIEW))?;
        let getter = capabilities.record_accessor(
            descriptor
                .record_accessor
                .as_deref()
                .unwrap_or(DEFAULT_RECORD_ACCESSOR),
        )?;

        Ok(Endpoint {
            name: name.to_string(),
            pid_type: descriptor.pid_type.clone(),
            route,
            template: descriptor
                .template
                .clone()
                .unwrap_or_else(|| DETAIL_TEMPLATE.to_string()),
            permission,
            view,
            resolver: Arc::new(Resolver::new(descriptor.pid_type.clone(), store, getter)),
            methods: descriptor
                .methods
                .iter()
                .map(|m| m.to_ascii_uppercase())
                .collect(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Endpoints in route-matching order.
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.router
            .routes()
            .filter_map(move |(name, _)| self.endpoints.get(name))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryPidStore, MemoryRecordStore};
    use crate::domain::ports::UrlBuilder;

    fn capabilities() -> Capabilities {
        Capabilities::new(Arc::new(MemoryRecordStore::new()))
    }

    fn store() -> Arc<dyn PidStore> {
        Arc::new(MemoryPidStore::new())
    }

    #[test]
    fn test_defaults_applied() {
        let descriptor = EndpointConfig::new("recid", "/records/<pid_value>");
        let endpoint =
            EndpointRegistry::create_endpoint("recid", &descriptor, &capabilities(), store())
                .unwrap();

        assert_eq!(endpoint.template, DETAIL_TEMPLATE);
        assert!(endpoint.permission.is_none());
        assert!(endpoint.allows("GET"));
        assert!(endpoint.allows("get"));
        assert!(!endpoint.allows("POST"));
        assert_eq!(endpoint.resolver.pid_type(), "recid");
    }

    #[test]
    fn test_invalid_descriptors_fail_fast() {
        let caps = capabilities();
        let no_route = EndpointConfig::new("recid", "");
        assert!(EndpointRegistry::create_endpoint("a", &no_route, &caps, store()).is_err());

        let no_pid_type = EndpointConfig::new("", "/records/<pid_value>");
        assert!(EndpointRegistry::create_endpoint("a", &no_pid_type, &caps, store()).is_err());

        let no_placeholder = EndpointConfig::new("recid", "/records/<id>/<pid_value_x>");
        assert!(EndpointRegistry::create_endpoint("a", &no_placeholder, &caps, store()).is_err());
    }

    #[test]
    fn test_unknown_capabilities_rejected() {
        let caps = capabilities();
        let descriptor = EndpointConfig::new("recid", "/records/<pid_value>").with_view("nope");
        assert!(matches!(
            EndpointRegistry::create_endpoint("recid", &descriptor, &caps, store()),
            Err(RecordsUiError::UnknownCapability { kind: "view", .. })
        ));

        let descriptor =
            EndpointConfig::new("recid", "/records/<pid_value>").with_permission("nobody");
        assert!(matches!(
            EndpointRegistry::create_endpoint("recid", &descriptor, &caps, store()),
            Err(RecordsUiError::UnknownCapability { kind: "permission rule", .. })
        ));
    }

    #[test]
    fn test_builtin_permissions() {
        let caps = capabilities();
        let open = caps.permission("open_access").unwrap();
        let mut data = HashMap::new();
        data.insert("access".to_string(), serde_json::json!("open"));
        assert!(open(&Record::new("r1", data), &Caller::anonymous()));
        assert!(!open(&Record::empty(), &Caller::anonymous()));

        let authenticated = caps.permission("authenticated").unwrap();
        assert!(authenticated(&Record::empty(), &Caller::user("u1")));
        assert!(!authenticated(&Record::empty(), &Caller::anonymous()));
    }

    #[test]
    fn test_build_registry() {
        let mut config = RecordsUiConfig::default();
        config.endpoints.insert(
            "dois".to_string(),
            EndpointConfig::new("doi", "/doi/<path:pid_value>"),
        );

        let registry = EndpointRegistry::build(&config, &capabilities(), store()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("dois").is_some());
        assert_eq!(
            registry
                .router()
                .build("dois", &[("pid_value", "10.1234/foo")])
                .unwrap(),
            "/doi/10.1234/foo"
        );
        assert_eq!(registry.router().build("security.login", &[]).unwrap(), "/login");
        assert_eq!(registry.endpoints().count(), 2);
    }
}
