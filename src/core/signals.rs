use crate::domain::model::RecordViewed;
use std::sync::Arc;

pub type RecordViewedSubscriber = Arc<dyn Fn(&RecordViewed) + Send + Sync>;

/// Subscribers are fixed at startup and called synchronously, in the order
/// they were connected.
#[derive(Clone, Default)]
pub struct RecordViewedSignal {
    subscribers: Vec<RecordViewedSubscriber>,
}

impl RecordViewedSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect<F>(&mut self, subscriber: F)
    where
        F: Fn(&RecordViewed) + Send + Sync + 'static,
    {
        self.subscribers.push(Arc::new(subscriber));
    }

    pub fn send(&self, event: &RecordViewed) {
        tracing::debug!(
            pid = %event.pid,
            receivers = self.subscribers.len(),
            "record-viewed"
        );
        for subscriber in &self.subscribers {
            subscriber(event);
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.subscribers.len()
    }
}
