pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::memory::{Fixtures, MemoryPidStore, MemoryRecordStore};
pub use adapters::templates::TemplateRegistry;
pub use config::{EndpointConfig, RecordsUiConfig};
pub use core::{registry::Capabilities, ui::RecordsUi, view::RecordView};
pub use domain::model::{
    Caller, PersistentIdentifier, PidStatus, Record, RecordViewed, Request, Response,
};
pub use utils::error::{ErrorKind, PidError, RecordsUiError, Result};
