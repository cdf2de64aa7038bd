use crate::domain::model::{PersistentIdentifier, Record};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordsUiError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown {kind} '{name}'")]
    UnknownCapability { kind: &'static str, name: String },

    #[error("Could not build URL for endpoint '{endpoint}': {reason}")]
    BuildError { endpoint: String, reason: String },

    #[error("Template '{template}' failed: {message}")]
    TemplateError { template: String, message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Export error: {message}")]
    ExportError { message: String },
}

pub type Result<T> = std::result::Result<T, RecordsUiError>;

/// Outcome of a pid resolution that did not produce a viewable record.
#[derive(Error, Debug)]
pub enum PidError {
    #[error("PID {pid_type}:{pid_value} does not exist")]
    DoesNotExist { pid_type: String, pid_value: String },

    #[error("PID {0} is not registered")]
    Unregistered(PersistentIdentifier),

    #[error("PID {pid} has been deleted")]
    Deleted {
        pid: PersistentIdentifier,
        record: Option<Record>,
    },

    #[error("No object assigned to {0}")]
    MissingObject(PersistentIdentifier),

    #[error("PID {pid} redirects to {destination}")]
    Redirected {
        pid: PersistentIdentifier,
        destination: PersistentIdentifier,
    },

    #[error(transparent)]
    Backend(#[from] RecordsUiError),
}

/// Request-level failures, each answered with a fixed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unregistered,
    Gone,
    MissingObject,
    ImpossibleRedirect,
    Forbidden,
    /// Answered with a redirect to the login endpoint.
    AuthRequired,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound | ErrorKind::Unregistered => 404,
            ErrorKind::Gone => 410,
            ErrorKind::MissingObject | ErrorKind::ImpossibleRedirect => 500,
            ErrorKind::Forbidden => 403,
            ErrorKind::AuthRequired => 302,
        }
    }

    /// Data inconsistencies an operator has to look at, as opposed to user errors.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, ErrorKind::MissingObject | ErrorKind::ImpossibleRedirect)
    }
}

impl PidError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            PidError::DoesNotExist { .. } => Some(ErrorKind::NotFound),
            PidError::Unregistered(_) => Some(ErrorKind::Unregistered),
            PidError::Deleted { .. } => Some(ErrorKind::Gone),
            PidError::MissingObject(_) => Some(ErrorKind::MissingObject),
            PidError::Redirected { .. } | PidError::Backend(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::PidStatus;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::Unregistered.status_code(), 404);
        assert_eq!(ErrorKind::Gone.status_code(), 410);
        assert_eq!(ErrorKind::MissingObject.status_code(), 500);
        assert_eq!(ErrorKind::ImpossibleRedirect.status_code(), 500);
        assert_eq!(ErrorKind::Forbidden.status_code(), 403);
        assert_eq!(ErrorKind::AuthRequired.status_code(), 302);
        assert!(ErrorKind::ImpossibleRedirect.is_integrity_error());
        assert!(ErrorKind::MissingObject.is_integrity_error());
        assert!(!ErrorKind::Unregistered.is_integrity_error());
        assert!(!ErrorKind::Forbidden.is_integrity_error());
    }

    #[test]
    fn test_pid_error_kind() {
        let pid = PersistentIdentifier::new("recid", "3", PidStatus::Registered);
        assert_eq!(
            PidError::MissingObject(pid.clone()).kind(),
            Some(ErrorKind::MissingObject)
        );
        assert_eq!(
            PidError::Deleted { pid, record: None }.kind(),
            Some(ErrorKind::Gone)
        );
        let err = PidError::DoesNotExist {
            pid_type: "recid".into(),
            pid_value: "9".into(),
        };
        assert_eq!(err.to_string(), "PID recid:9 does not exist");
    }
}
