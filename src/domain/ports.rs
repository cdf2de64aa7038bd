use crate::domain::model::{Caller, PersistentIdentifier, Record};
use crate::utils::error::{PidError, RecordsUiError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Identifier registry owned by the host application.
#[async_trait]
pub trait PidStore: Send + Sync {
    async fn get(&self, pid_type: &str, pid_value: &str) -> Result<Option<PersistentIdentifier>>;

    /// Destination of a redirected identifier.
    async fn get_redirect(
        &self,
        pid: &PersistentIdentifier,
    ) -> Result<Option<PersistentIdentifier>>;
}

#[async_trait]
pub trait RecordAccessor: Send + Sync {
    async fn get_record(&self, id: &str) -> Result<Option<Record>>;
}

/// Turns a pid value into the identifier and the record it points to.
#[async_trait]
pub trait PidResolver: Send + Sync {
    fn pid_type(&self) -> &str;

    async fn resolve(
        &self,
        pid_value: &str,
    ) -> std::result::Result<(PersistentIdentifier, Record), PidError>;
}

pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String>;
}

pub trait UrlBuilder {
    /// Fails with [`RecordsUiError::BuildError`] when no such endpoint exists.
    fn build(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String>;
}

pub type PermissionRule = Arc<dyn Fn(&Record, &Caller) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Serialized {
    Text(String),
    Bytes(Vec<u8>),
}

impl Serialized {
    pub fn into_text(self) -> Result<String> {
        match self {
            Serialized::Text(text) => Ok(text),
            Serialized::Bytes(bytes) => {
                String::from_utf8(bytes).map_err(|e| RecordsUiError::ExportError {
                    message: format!("serializer produced invalid UTF-8: {}", e),
                })
            }
        }
    }
}

pub trait Serializer: Send + Sync {
    fn serialize(&self, pid: &PersistentIdentifier, record: &Record) -> Result<Serialized>;
}
