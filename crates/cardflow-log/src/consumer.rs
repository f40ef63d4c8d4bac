use crate::log::EventLog;
use cardflow_core::EventId;
use std::sync::Arc;

/// A named consumer over the event log
///
/// The cursor lives in the log, keyed by consumer name, so re-subscribing
/// under the same name resumes from the last acknowledged event. Events past
/// the cursor are redelivered until acknowledged.
pub struct Consumer {
    log: EventLog,
    name: String,
}

impl Consumer {
    pub(crate) fn new(log: EventLog, name: String) -> Self {
        Self { log, name }
    }

    /// Get the consumer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current cursor position (last acknowledged event id)
    ///
    /// Returns None if no events have been acknowledged yet.
    pub fn position(&self) -> Option<EventId> {
        self.log.inner.cursors.read().get(&self.name).copied()
    }

    /// Read the next unacknowledged event
    ///
    /// Call `ack()` to advance the cursor after processing; until then the
    /// same event is returned again.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(EventId, Arc<[u8]>)> {
        let start = match self.position() {
            None => 0,
            Some(n) => n + 1,
        };

        let events = self.log.inner.events.read();
        events
            .get(start as usize)
            .map(|bytes| (start, bytes.clone()))
    }

    /// Acknowledge processing of an event (advance the cursor)
    ///
    /// Acknowledging an already-passed id is a no-op, so redelivered events
    /// can be acked unconditionally.
    pub fn ack(&mut self, event_id: EventId) {
        let mut cursors = self.log.inner.cursors.write();
        let cursor = cursors.entry(self.name.clone()).or_insert(event_id);
        if *cursor < event_id {
            *cursor = event_id;
        }
    }

    /// Read the next event, waiting via the log's wake strategy when idle
    ///
    /// Returns None once the log is closed and fully drained.
    pub async fn next_async(&mut self) -> Option<(EventId, Arc<[u8]>)> {
        loop {
            if let Some(event) = self.next() {
                return Some(event);
            }

            if self.log.is_closed() {
                return None;
            }

            self.log.inner.wake.wait().await;
        }
    }
}
