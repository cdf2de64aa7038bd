use crate::domain::model::{PersistentIdentifier, Record};
use crate::domain::ports::{Serialized, Serializer};
use crate::utils::error::{RecordsUiError, Result};
use std::collections::BTreeMap;

const PID_COLUMN: &str = "pid_value";

/// Pretty-printed record metadata with sorted keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, _pid: &PersistentIdentifier, record: &Record) -> Result<Serialized> {
        let sorted: BTreeMap<&String, &serde_json::Value> = record.data.iter().collect();
        Ok(Serialized::Text(serde_json::to_string_pretty(&sorted)?))
    }
}

/// One header row and one data row; the first column is `pid_value`.
/// A record field with that same name is left out.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSerializer;

impl Serializer for CsvSerializer {
    fn serialize(&self, pid: &PersistentIdentifier, record: &Record) -> Result<Serialized> {
        let sorted: BTreeMap<&String, &serde_json::Value> = record
            .data
            .iter()
            .filter(|(k, _)| k.as_str() != PID_COLUMN)
            .collect();

        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header = vec![PID_COLUMN];
        header.extend(sorted.keys().map(|k| k.as_str()));
        writer.write_record(&header)?;

        let mut row = vec![pid.pid_value.clone()];
        row.extend(sorted.values().map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }));
        writer.write_record(&row)?;

        let bytes = writer.into_inner().map_err(|e| RecordsUiError::ExportError {
            message: format!("CSV flush failed: {}", e),
        })?;
        Ok(Serialized::Bytes(bytes))
    }
}
