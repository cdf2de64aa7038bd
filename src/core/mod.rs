pub mod export;
pub mod registry;
pub mod resolver;
pub mod routing;
pub mod signals;
pub mod ui;
pub mod view;

pub use crate::domain::model::{PersistentIdentifier, PidStatus, Record, Request, Response};
pub use crate::domain::ports::{PidResolver, PidStore, RecordAccessor, TemplateEngine};
pub use crate::utils::error::Result;
