//! In-memory identifier and record stores, used by the CLI fixtures and tests.

use crate::domain::model::{PersistentIdentifier, PidStatus, Record};
use crate::domain::ports::{PidStore, RecordAccessor};
use crate::utils::error::{RecordsUiError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

type PidKey = (String, String);

fn key(pid_type: &str, pid_value: &str) -> PidKey {
    (pid_type.to_string(), pid_value.to_string())
}

#[derive(Default)]
struct PidState {
    pids: HashMap<PidKey, PersistentIdentifier>,
    redirects: HashMap<PidKey, PidKey>,
}

#[derive(Default)]
pub struct MemoryPidStore {
    state: RwLock<PidState>,
}

impl MemoryPidStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(
        &self,
        pid_type: &str,
        pid_value: &str,
        status: PidStatus,
        object_id: Option<&str>,
    ) -> Result<PersistentIdentifier> {
        let mut state = self.state.write().await;
        let k = key(pid_type, pid_value);
        if state.pids.contains_key(&k) {
            return Err(RecordsUiError::StorageError {
                message: format!("PID {}:{} already exists", pid_type, pid_value),
            });
        }

        let mut pid = PersistentIdentifier::new(pid_type, pid_value, status);
        pid.object_id = object_id.map(str::to_string);
        tracing::debug!(pid = %pid, status = status.as_str(), "created pid");
        state.pids.insert(k, pid.clone());
        Ok(pid)
    }

    pub async fn assign(&self, pid_type: &str, pid_value: &str, object_id: &str) -> Result<()> {
        self.update(pid_type, pid_value, |pid| {
            pid.object_id = Some(object_id.to_string());
            Ok(())
        })
        .await
    }

    pub async fn register(&self, pid_type: &str, pid_value: &str) -> Result<()> {
        self.update(pid_type, pid_value, |pid| match pid.status {
            PidStatus::New | PidStatus::Reserved | PidStatus::Registered => {
                pid.status = PidStatus::Registered;
                Ok(())
            }
            other => Err(RecordsUiError::StorageError {
                message: format!("cannot register PID {} in state {}", pid, other.as_str()),
            }),
        })
        .await
    }

    /// A never-registered pid is dropped outright; anything else keeps a tombstone.
    pub async fn delete(&self, pid_type: &str, pid_value: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let k = key(pid_type, pid_value);
        let pid = state.pids.get_mut(&k).ok_or_else(|| RecordsUiError::StorageError {
            message: format!("PID {}:{} does not exist", pid_type, pid_value),
        })?;

        if pid.status == PidStatus::New {
            state.pids.remove(&k);
        } else {
            pid.status = PidStatus::Deleted;
            state.redirects.remove(&k);
        }
        Ok(())
    }

    pub async fn redirect(&self, source: (&str, &str), destination: (&str, &str)) -> Result<()> {
        let mut state = self.state.write().await;
        let src = key(source.0, source.1);
        let dst = key(destination.0, destination.1);

        if !state.pids.contains_key(&dst) {
            return Err(RecordsUiError::StorageError {
                message: format!("redirect target {}:{} does not exist", dst.0, dst.1),
            });
        }

        let pid = state.pids.get_mut(&src).ok_or_else(|| RecordsUiError::StorageError {
            message: format!("PID {}:{} does not exist", src.0, src.1),
        })?;
        if !matches!(pid.status, PidStatus::Registered | PidStatus::Redirected) {
            return Err(RecordsUiError::StorageError {
                message: format!("cannot redirect PID {} in state {}", pid, pid.status.as_str()),
            });
        }
        pid.status = PidStatus::Redirected;
        state.redirects.insert(src, dst);
        Ok(())
    }

    async fn update<F>(&self, pid_type: &str, pid_value: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut PersistentIdentifier) -> Result<()>,
    {
        let mut state = self.state.write().await;
        let pid = state
            .pids
            .get_mut(&key(pid_type, pid_value))
            .ok_or_else(|| RecordsUiError::StorageError {
                message: format!("PID {}:{} does not exist", pid_type, pid_value),
            })?;
        f(pid)
    }
}

#[async_trait]
impl PidStore for MemoryPidStore {
    async fn get(&self, pid_type: &str, pid_value: &str) -> Result<Option<PersistentIdentifier>> {
        let state = self.state.read().await;
        Ok(state.pids.get(&key(pid_type, pid_value)).cloned())
    }

    async fn get_redirect(
        &self,
        pid: &PersistentIdentifier,
    ) -> Result<Option<PersistentIdentifier>> {
        let state = self.state.read().await;
        Ok(state
            .redirects
            .get(&key(&pid.pid_type, &pid.pid_value))
            .and_then(|dst| state.pids.get(dst))
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: Record) {
        self.records.write().await.insert(record.id.clone(), record);
    }

    pub async fn remove(&self, id: &str) -> Option<Record> {
        self.records.write().await.remove(id)
    }
}

#[async_trait]
impl RecordAccessor for MemoryRecordStore {
    async fn get_record(&self, id: &str) -> Result<Option<Record>> {
        Ok(self.records.read().await.get(id).cloned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidRef {
    pub pid_type: String,
    pub pid_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidFixture {
    pub pid_type: String,
    pub pid_value: String,
    #[serde(default = "default_fixture_status")]
    pub status: PidStatus,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub redirect_to: Option<PidRef>,
}

fn default_fixture_status() -> PidStatus {
    PidStatus::Registered
}

/// Demo data set: records plus the identifiers pointing at them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub pids: Vec<PidFixture>,
}

impl Fixtures {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub async fn load_into(
        &self,
        pids: &MemoryPidStore,
        records: &MemoryRecordStore,
    ) -> Result<()> {
        for record in &self.records {
            records.insert(record.clone()).await;
        }

        // Redirect targets must exist before the redirect is recorded.
        for fixture in &self.pids {
            let status = if fixture.redirect_to.is_some() {
                PidStatus::Registered
            } else {
                fixture.status
            };
            pids.create(
                &fixture.pid_type,
                &fixture.pid_value,
                status,
                fixture.object_id.as_deref(),
            )
            .await?;
        }

        for fixture in &self.pids {
            if let Some(target) = &fixture.redirect_to {
                pids.redirect(
                    (&fixture.pid_type, &fixture.pid_value),
                    (&target.pid_type, &target.pid_value),
                )
                .await?;
            }
        }

        tracing::info!(
            records = self.records.len(),
            pids = self.pids.len(),
            "loaded fixtures"
        );
        Ok(())
    }
}
