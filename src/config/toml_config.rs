use crate::adapters::templates::{BASE_TEMPLATE, DETAIL_TEMPLATE, TOMBSTONE_TEMPLATE};
use crate::utils::error::{RecordsUiError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsUiConfig {
    #[serde(default = "default_base_template")]
    pub base_template: String,
    #[serde(default = "default_tombstone_template")]
    pub tombstone_template: String,
    /// Permission rule for endpoints that do not name their own.
    #[serde(default)]
    pub default_permission: Option<String>,
    #[serde(default = "default_login_endpoint")]
    pub login_endpoint: String,
    #[serde(default)]
    pub template_dir: Option<String>,
    #[serde(default = "default_endpoints")]
    pub endpoints: BTreeMap<String, EndpointConfig>,
    /// Host-owned endpoints (e.g. the login page) that redirects may point at.
    /// Defaults to `security.login = "/login"`; a `[host_routes]` table replaces it.
    #[serde(default = "default_host_routes")]
    pub host_routes: BTreeMap<String, String>,
    #[serde(default)]
    pub export_formats: BTreeMap<String, BTreeMap<String, ExportFormatEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub pid_type: String,
    #[serde(default)]
    pub route: String,
    pub template: Option<String>,
    pub permission: Option<String>,
    pub view: Option<String>,
    pub record_accessor: Option<String>,
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
}

impl EndpointConfig {
    pub fn new(pid_type: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            pid_type: pid_type.into(),
            route: route.into(),
            template: None,
            permission: None,
            view: None,
            record_accessor: None,
            methods: default_methods(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    pub fn with_methods(mut self, methods: &[&str]) -> Self {
        self.methods = methods.iter().map(|m| m.to_string()).collect();
        self
    }
}

/// `slug = false` retires a format; otherwise a full format description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportFormatEntry {
    Retired(bool),
    Format(ExportFormatConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFormatConfig {
    pub title: String,
    pub serializer: String,
    #[serde(default)]
    pub order: i64,
}

fn default_base_template() -> String {
    BASE_TEMPLATE.to_string()
}

fn default_tombstone_template() -> String {
    TOMBSTONE_TEMPLATE.to_string()
}

fn default_login_endpoint() -> String {
    "security.login".to_string()
}

fn default_host_routes() -> BTreeMap<String, String> {
    let mut routes = BTreeMap::new();
    routes.insert(default_login_endpoint(), "/login".to_string());
    routes
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string()]
}

fn default_endpoints() -> BTreeMap<String, EndpointConfig> {
    let mut endpoints = BTreeMap::new();
    endpoints.insert(
        "recid".to_string(),
        EndpointConfig::new("recid", "/records/<pid_value>").with_template(DETAIL_TEMPLATE),
    );
    endpoints
}

impl Default for RecordsUiConfig {
    fn default() -> Self {
        Self {
            base_template: default_base_template(),
            tombstone_template: default_tombstone_template(),
            default_permission: None,
            login_endpoint: default_login_endpoint(),
            template_dir: None,
            endpoints: default_endpoints(),
            host_routes: default_host_routes(),
            export_formats: BTreeMap::new(),
        }
    }
}

impl RecordsUiConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RecordsUiError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RecordsUiError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RecordsUiError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("tombstone_template", &self.tombstone_template)?;
        validation::validate_non_empty_string("base_template", &self.base_template)?;
        validation::validate_non_empty_string("login_endpoint", &self.login_endpoint)?;

        if let Some(dir) = &self.template_dir {
            validation::validate_path("template_dir", dir)?;
        }

        for (name, endpoint) in &self.endpoints {
            validation::validate_non_empty_string("endpoints", name)?;
            validation::validate_non_empty_string(
                &format!("endpoints.{}.pid_type", name),
                &endpoint.pid_type,
            )?;
            validation::validate_route(&format!("endpoints.{}.route", name), &endpoint.route)?;
            validation::validate_methods(
                &format!("endpoints.{}.methods", name),
                &endpoint.methods,
            )?;
        }

        for (name, route) in &self.host_routes {
            if self.endpoints.contains_key(name) {
                return Err(RecordsUiError::InvalidConfigValueError {
                    field: format!("host_routes.{}", name),
                    value: route.clone(),
                    reason: "Name is already used by a records endpoint".to_string(),
                });
            }
            validation::validate_non_empty_string(&format!("host_routes.{}", name), route)?;
        }

        for (pid_type, formats) in &self.export_formats {
            for (slug, entry) in formats {
                let field = format!("export_formats.{}.{}", pid_type, slug);
                match entry {
                    ExportFormatEntry::Retired(false) => {}
                    ExportFormatEntry::Retired(true) => {
                        return Err(RecordsUiError::InvalidConfigValueError {
                            field,
                            value: "true".to_string(),
                            reason: "Only `false` may be used to retire a format".to_string(),
                        });
                    }
                    ExportFormatEntry::Format(format) => {
                        validation::validate_non_empty_string(
                            &format!("{}.title", field),
                            &format.title,
                        )?;
                        validation::validate_non_empty_string(
                            &format!("{}.serializer", field),
                            &format.serializer,
                        )?;
                    }
                }
            }
        }

        Ok(())
    }
}

impl Validate for RecordsUiConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = RecordsUiConfig::from_toml_str("").unwrap();

        assert_eq!(config.tombstone_template, "records_ui/tombstone.html");
        assert_eq!(config.login_endpoint, "security.login");
        assert_eq!(config.host_routes["security.login"], "/login");
        assert_eq!(RecordsUiConfig::default().host_routes, config.host_routes);
        assert!(config.default_permission.is_none());
        let recid = &config.endpoints["recid"];
        assert_eq!(recid.pid_type, "recid");
        assert_eq!(recid.route, "/records/<pid_value>");
        assert_eq!(recid.methods, vec!["GET".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_endpoints_and_formats() {
        let toml_content = r#"
default_permission = "open_access"

[endpoints.recid]
pid_type = "recid"
route = "/records/<pid_value>"

[endpoints.recid_export]
pid_type = "recid"
route = "/records/<pid_value>/export/<format>"
view = "export"
template = "records_ui/export.html"
methods = ["GET", "POST"]

[host_routes]
"security.login" = "/login"

[export_formats.recid]
marcxml = false

[export_formats.recid.json]
title = "JSON"
serializer = "json"
order = 1
"#;

        let config = RecordsUiConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_permission.as_deref(), Some("open_access"));
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints["recid_export"].view.as_deref(), Some("export"));
        assert_eq!(config.host_routes["security.login"], "/login");

        let formats = &config.export_formats["recid"];
        assert!(matches!(formats["marcxml"], ExportFormatEntry::Retired(false)));
        match &formats["json"] {
            ExportFormatEntry::Format(f) => {
                assert_eq!(f.title, "JSON");
                assert_eq!(f.order, 1);
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_route_without_pid_value_rejected() {
        let config = RecordsUiConfig::from_toml_str(
            r#"
[endpoints.broken]
pid_type = "recid"
route = "/records/<id>"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_pid_type_rejected() {
        let config = RecordsUiConfig::from_toml_str(
            r#"
[endpoints.broken]
route = "/records/<pid_value>"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(RecordsUiError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_retired_true_rejected() {
        let config = RecordsUiConfig::from_toml_str(
            r#"
[export_formats.recid]
json = true
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RECORDS_UI_TEST_LOGIN", "accounts.login");

        let config =
            RecordsUiConfig::from_toml_str(r#"login_endpoint = "${RECORDS_UI_TEST_LOGIN}""#)
                .unwrap();
        assert_eq!(config.login_endpoint, "accounts.login");

        std::env::remove_var("RECORDS_UI_TEST_LOGIN");
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(br#"tombstone_template = "custom/tombstone.html""#)
            .unwrap();

        let config = RecordsUiConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.tombstone_template, "custom/tombstone.html");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            RecordsUiConfig::from_toml_str("endpoints = ["),
            Err(RecordsUiError::ConfigError { .. })
        ));
    }
}
