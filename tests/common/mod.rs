#![allow(dead_code)]

use records_ui::{
    Capabilities, Fixtures, MemoryPidStore, MemoryRecordStore, RecordViewed, RecordsUi,
    RecordsUiConfig,
};
use std::sync::{Arc, Mutex};

pub const FIXTURES: &str = r#"{
    "records": [
        {"id": "r1", "data": {"title": "X", "recid": 1}},
        {"id": "r2", "data": {"title": "Test record 2", "recid": 2}},
        {"id": "r8", "data": {"title": "Secret", "access": "restricted"}},
        {"id": "r9", "data": {"title": "Open", "access": "open"}}
    ],
    "pids": [
        {"pid_type": "recid", "pid_value": "1", "object_id": "r1"},
        {"pid_type": "recid", "pid_value": "2", "object_id": "r2", "status": "deleted"},
        {"pid_type": "recid", "pid_value": "3"},
        {"pid_type": "recid", "pid_value": "4", "status": "new"},
        {"pid_type": "recid", "pid_value": "5",
         "redirect_to": {"pid_type": "recid", "pid_value": "1"}},
        {"pid_type": "recid", "pid_value": "6",
         "redirect_to": {"pid_type": "doi", "pid_value": "10.1234/foo.bar"}},
        {"pid_type": "recid", "pid_value": "7", "status": "deleted"},
        {"pid_type": "recid", "pid_value": "8", "object_id": "r8"},
        {"pid_type": "recid", "pid_value": "9", "object_id": "r9"},
        {"pid_type": "doi", "pid_value": "10.1234/foo.bar", "object_id": "r1"}
    ]
}"#;

pub struct TestApp {
    pub pids: Arc<MemoryPidStore>,
    pub records: Arc<MemoryRecordStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        let pids = Arc::new(MemoryPidStore::new());
        let records = Arc::new(MemoryRecordStore::new());
        Fixtures::from_json_str(FIXTURES)
            .unwrap()
            .load_into(&pids, &records)
            .await
            .unwrap();
        Self { pids, records }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::new(self.records.clone())
    }

    pub fn ui(&self, config: RecordsUiConfig) -> RecordsUi {
        RecordsUi::builder(config, self.capabilities(), self.pids.clone())
            .build()
            .unwrap()
    }

    /// UI plus the pid values seen by a record-viewed subscriber.
    pub fn ui_with_recorder(
        &self,
        config: RecordsUiConfig,
    ) -> (RecordsUi, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let ui = RecordsUi::builder(config, self.capabilities(), self.pids.clone())
            .on_record_viewed(move |event: &RecordViewed| {
                sink.lock().unwrap().push(event.pid.pid_value.clone());
            })
            .build()
            .unwrap();
        (ui, seen)
    }
}
