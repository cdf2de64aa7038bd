use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PidStatus {
    New,
    Reserved,
    Registered,
    Redirected,
    Deleted,
}

impl PidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PidStatus::New => "new",
            PidStatus::Reserved => "reserved",
            PidStatus::Registered => "registered",
            PidStatus::Redirected => "redirected",
            PidStatus::Deleted => "deleted",
        }
    }
}

/// Persistent identifier as handed out by the identifier store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentIdentifier {
    pub pid_type: String,
    pub pid_value: String,
    pub status: PidStatus,
    /// Internal id of the record this identifier points to, if assigned.
    #[serde(default)]
    pub object_id: Option<String>,
}

impl PersistentIdentifier {
    pub fn new(
        pid_type: impl Into<String>,
        pid_value: impl Into<String>,
        status: PidStatus,
    ) -> Self {
        Self {
            pid_type: pid_type.into(),
            pid_value: pid_value.into(),
            status,
            object_id: None,
        }
    }

    pub fn with_object(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }
}

impl fmt::Display for PersistentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pid_type, self.pid_value)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, data: HashMap<String, serde_json::Value>) -> Self {
        Self { id: id.into(), data }
    }

    /// Placeholder handed to the tombstone when a deleted identifier has no record.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Who is making the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub caller: Caller,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            query: None,
            caller: Caller::anonymous(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = caller;
        self
    }

    /// Original URL of the request, used as the login return target.
    pub fn url(&self) -> String {
        match self.query.as_deref() {
            Some(q) if !q.is_empty() => format!("{}?{}", self.path, q),
            _ => self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub location: Option<String>,
    pub content_type: String,
}

impl Response {
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            location: None,
            content_type: "text/html; charset=utf-8".to_string(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::html(200, body)
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            status: 302,
            body: format!("Redirecting to {}", location),
            location: Some(location),
            content_type: "text/html; charset=utf-8".to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self::html(status, reason_phrase(status))
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        410 => "Gone",
        500 => "Internal Server Error",
        _ => "",
    }
}

/// Emitted after the default view resolved and is about to render a record.
#[derive(Debug, Clone)]
pub struct RecordViewed {
    pub endpoint: String,
    pub pid: PersistentIdentifier,
    pub record: Record,
    pub viewed_at: DateTime<Utc>,
}
