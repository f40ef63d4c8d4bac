use crate::consumer::Consumer;
use crate::notification::WakeStrategy;
use cardflow_core::{CardflowError, EventId, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Information about a consumer
#[derive(Debug, Clone)]
pub struct ConsumerInfo {
    /// Consumer name
    pub name: String,

    /// Number of events acknowledged
    pub position: u64,

    /// Number of unacknowledged events behind the head
    pub lag: u64,
}

pub(crate) struct LogInner {
    /// Appended event bytes; the index is the event id.
    pub(crate) events: RwLock<Vec<Arc<[u8]>>>,

    /// Last acknowledged event id per consumer name.
    pub(crate) cursors: RwLock<HashMap<String, EventId>>,

    pub(crate) closed: AtomicBool,

    pub(crate) wake: WakeStrategy,
}

/// Append-only, ordered lifecycle event log.
///
/// Appends return success synchronously to the publisher. Each named consumer
/// keeps its own cursor, advanced only by explicit acknowledgment, so an event
/// processed without an ack is redelivered — at-least-once delivery in
/// appended order.
#[derive(Clone)]
pub struct EventLog {
    pub(crate) inner: Arc<LogInner>,
}

impl EventLog {
    /// Create a new event log with the default polling wake strategy
    pub fn new() -> Self {
        Self::with_wake_strategy(WakeStrategy::default())
    }

    /// Create a new event log with a specific wake strategy
    pub fn with_wake_strategy(wake: WakeStrategy) -> Self {
        Self {
            inner: Arc::new(LogInner {
                events: RwLock::new(Vec::new()),
                cursors: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
                wake,
            }),
        }
    }

    /// Create a new event log that wakes consumers via `tokio::sync::Notify`
    pub fn with_notifications() -> Self {
        Self::with_wake_strategy(WakeStrategy::notify())
    }

    /// Append an event, returning its id.
    ///
    /// Fails once the log has been closed; nothing is partially appended.
    pub fn append(&self, bytes: &[u8]) -> Result<EventId> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(CardflowError::Publish("event log is closed".to_string()));
        }

        let id = {
            let mut events = self.inner.events.write();
            events.push(Arc::from(bytes));
            (events.len() - 1) as EventId
        };

        self.inner.wake.wake();
        Ok(id)
    }

    /// Subscribe as a named consumer, creating or resuming its cursor
    pub fn subscribe(&self, name: impl Into<String>) -> Consumer {
        Consumer::new(self.clone(), name.into())
    }

    /// Number of events appended so far
    pub fn len(&self) -> u64 {
        self.inner.events.read().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.inner.events.read().is_empty()
    }

    /// Get information about a consumer
    pub fn consumer_info(&self, name: &str) -> ConsumerInfo {
        let head = self.len();
        let position = match self.inner.cursors.read().get(name) {
            Some(cursor) => cursor + 1,
            None => 0,
        };

        ConsumerInfo {
            name: name.to_string(),
            position,
            lag: head.saturating_sub(position),
        }
    }

    /// Stop accepting appends. Existing events remain readable by consumers.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        // Release anyone parked on an empty log
        self.inner.wake.wake();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
