use crate::utils::error::{RecordsUiError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub const HTTP_METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RecordsUiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    validate_non_empty_string(field_name, path)?;

    if path.contains('\0') {
        return Err(RecordsUiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// A records route must be absolute and carry a `pid_value` placeholder.
pub fn validate_route(field_name: &str, route: &str) -> Result<()> {
    validate_non_empty_string(field_name, route)?;

    if !route.starts_with('/') {
        return Err(RecordsUiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: route.to_string(),
            reason: "Route must start with '/'".to_string(),
        });
    }

    if !route.contains("<pid_value>") && !route.contains(":pid_value>") {
        return Err(RecordsUiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: route.to_string(),
            reason: "Route must include the <pid_value> placeholder".to_string(),
        });
    }

    Ok(())
}

pub fn validate_methods(field_name: &str, methods: &[String]) -> Result<()> {
    if methods.is_empty() {
        return Err(RecordsUiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: "[]".to_string(),
            reason: "At least one HTTP method is required".to_string(),
        });
    }

    let allowed: HashSet<&str> = HTTP_METHODS.iter().copied().collect();
    for method in methods {
        if !allowed.contains(method.to_ascii_uppercase().as_str()) {
            return Err(RecordsUiError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: method.clone(),
                reason: format!(
                    "Unsupported HTTP method. Valid methods: {}",
                    HTTP_METHODS.join(", ")
                ),
            });
        }
    }

    Ok(())
}
