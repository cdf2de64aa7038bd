use crate::domain::model::{PersistentIdentifier, PidStatus, Record};
use crate::domain::ports::{PidResolver, PidStore, RecordAccessor};
use crate::utils::error::PidError;
use async_trait::async_trait;
use std::sync::Arc;

/// Resolver bound to one pid type and one record accessor.
#[derive(Clone)]
pub struct Resolver {
    pid_type: String,
    store: Arc<dyn PidStore>,
    getter: Arc<dyn RecordAccessor>,
}

impl Resolver {
    pub fn new(
        pid_type: impl Into<String>,
        store: Arc<dyn PidStore>,
        getter: Arc<dyn RecordAccessor>,
    ) -> Self {
        Self {
            pid_type: pid_type.into(),
            store,
            getter,
        }
    }

    async fn assigned_record(
        &self,
        pid: &PersistentIdentifier,
    ) -> Result<Option<Record>, PidError> {
        match pid.object_id.as_deref() {
            Some(id) => Ok(self.getter.get_record(id).await?),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PidResolver for Resolver {
    fn pid_type(&self) -> &str {
        &self.pid_type
    }

    async fn resolve(&self, pid_value: &str) -> Result<(PersistentIdentifier, Record), PidError> {
        let pid = self
            .store
            .get(&self.pid_type, pid_value)
            .await?
            .ok_or_else(|| PidError::DoesNotExist {
                pid_type: self.pid_type.clone(),
                pid_value: pid_value.to_string(),
            })?;

        match pid.status {
            PidStatus::New | PidStatus::Reserved => Err(PidError::Unregistered(pid)),
            PidStatus::Deleted => {
                let record = self.assigned_record(&pid).await?;
                Err(PidError::Deleted { pid, record })
            }
            PidStatus::Redirected => match self.store.get_redirect(&pid).await? {
                Some(destination) => Err(PidError::Redirected { pid, destination }),
                // A redirect without a target is as broken as a missing object.
                None => Err(PidError::MissingObject(pid)),
            },
            PidStatus::Registered => match self.assigned_record(&pid).await? {
                Some(record) => Ok((pid, record)),
                None => Err(PidError::MissingObject(pid)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryPidStore, MemoryRecordStore};
    use std::collections::HashMap;

    async fn resolver() -> (Resolver, Arc<MemoryPidStore>) {
        let pids = Arc::new(MemoryPidStore::new());
        let records = Arc::new(MemoryRecordStore::new());

        let mut data = HashMap::new();
        data.insert("title".to_string(), serde_json::json!("Test record 1"));
        records.insert(Record::new("r1", data)).await;

        pids.create("recid", "1", PidStatus::Registered, Some("r1")).await.unwrap();
        pids.create("recid", "2", PidStatus::Registered, Some("r1")).await.unwrap();
        pids.delete("recid", "2").await.unwrap();
        pids.create("recid", "3", PidStatus::Registered, None).await.unwrap();
        pids.create("recid", "4", PidStatus::New, None).await.unwrap();
        pids.create("recid", "5", PidStatus::Registered, Some("gone")).await.unwrap();
        pids.create("recid", "6", PidStatus::Registered, Some("r1")).await.unwrap();

        (Resolver::new("recid", pids.clone(), records), pids)
    }

    #[tokio::test]
    async fn test_resolve_registered() {
        let (resolver, _) = resolver().await;
        let (pid, record) = resolver.resolve("1").await.unwrap();
        assert_eq!(pid.pid_value, "1");
        assert_eq!(record.get_str("title"), Some("Test record 1"));
    }

    #[tokio::test]
    async fn test_resolve_outcomes() {
        let (resolver, pids) = resolver().await;

        assert!(matches!(
            resolver.resolve("2").await,
            Err(PidError::Deleted { record: Some(_), .. })
        ));
        assert!(matches!(resolver.resolve("3").await, Err(PidError::MissingObject(_))));
        assert!(matches!(resolver.resolve("4").await, Err(PidError::Unregistered(_))));
        assert!(matches!(resolver.resolve("5").await, Err(PidError::MissingObject(_))));
        assert!(matches!(
            resolver.resolve("99").await,
            Err(PidError::DoesNotExist { .. })
        ));

        pids.redirect(("recid", "6"), ("recid", "1")).await.unwrap();
        match resolver.resolve("6").await {
            Err(PidError::Redirected { destination, .. }) => {
                assert_eq!(destination.pid_value, "1")
            }
            other => panic!("expected redirect, got {:?}", other),
        }
    }
}
