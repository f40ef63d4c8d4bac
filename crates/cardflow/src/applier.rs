//! Consumer side of the pipeline: drains lifecycle events off the log and
//! turns them into persisted commit intents or tombstones.
//!
//! Delivery is at-least-once, so every application path is idempotent: a
//! redelivered `Created` overwrites its own pending row, a redelivered
//! `Deleted` re-records an existing tombstone. An event is acknowledged only
//! after it applied cleanly; store failures leave the cursor in place and the
//! log redelivers. Malformed bytes are logged and dropped — they would never
//! apply, and must not wedge the consumer.

use cardflow_core::{
    CardflowError, DurableStore, EventKind, LifecycleEvent, PendingCommit, Result,
};
use cardflow_log::Consumer;
use chrono::Duration as ChronoDuration;
use cardflow_sqlite::CommitQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Applies a single lifecycle event to the write-behind bookkeeping.
pub struct EventApplier {
    queue: CommitQueue,
    durable: Arc<dyn DurableStore>,
    commit_delay: Duration,
}

impl EventApplier {
    pub fn new(queue: CommitQueue, durable: Arc<dyn DurableStore>, commit_delay: Duration) -> Self {
        Self {
            queue,
            durable,
            commit_delay,
        }
    }

    /// Apply one event. Idempotent under redelivery.
    pub fn apply(&self, event: &LifecycleEvent) -> Result<()> {
        let key = event.card_id.key();

        match event.kind {
            EventKind::Created => {
                // A delete already raced ahead of this create: discard, the
                // card must never commit.
                if self.queue.is_tombstoned(&key)? {
                    debug!(card = %key, "create suppressed by tombstone");
                    return Ok(());
                }

                let card = event.payload.clone().ok_or_else(|| {
                    CardflowError::InvalidState(format!(
                        "created event for {} carries no payload",
                        key
                    ))
                })?;

                let delay = ChronoDuration::from_std(self.commit_delay)
                    .map_err(|e| CardflowError::Config(e.to_string()))?;
                let pending = PendingCommit::new(card, event.emitted_at + delay);
                self.queue.enqueue(&pending)?;
                debug!(card = %key, fire_at = %pending.fire_at, "commit scheduled");
            }
            EventKind::Deleted => {
                if self.durable.get(&key)?.is_some() {
                    // Already committed; the direct delete path handled it.
                    debug!(card = %key, "delete event for committed card, no-op");
                    return Ok(());
                }

                self.queue.record_tombstone(&key, event.emitted_at)?;
                if self.queue.remove(&key)? {
                    debug!(card = %key, "pending commit cancelled by delete");
                }
            }
        }

        Ok(())
    }
}

/// Long-running consumer loop feeding the applier.
pub struct EventConsumer {
    consumer: Consumer,
    applier: EventApplier,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl EventConsumer {
    pub fn new(consumer: Consumer, applier: EventApplier, poll_interval: Duration) -> Self {
        Self {
            consumer,
            applier,
            poll_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Drain and apply every event currently available.
    ///
    /// Returns the number of events acknowledged. An event that fails on a
    /// retryable error (store down) stops the drain without an ack, so the
    /// log redelivers it on the next pass. An event that can never apply —
    /// undecodable bytes, or decodable but semantically invalid — is logged,
    /// acked and dropped: redelivering it would wedge the consumer and starve
    /// every event behind it.
    pub fn drain_available(&mut self) -> usize {
        let mut processed = 0;

        while let Some((id, bytes)) = self.consumer.next() {
            match LifecycleEvent::from_bytes(&bytes) {
                Ok(event) => match self.applier.apply(&event) {
                    Ok(()) => {
                        self.consumer.ack(id);
                        processed += 1;
                    }
                    Err(e) if e.is_permanent() => {
                        warn!(event_id = id, error = %e, "dropping event that can never apply");
                        self.consumer.ack(id);
                        processed += 1;
                    }
                    Err(e) => {
                        error!(event_id = id, error = %e, "event application failed, will retry");
                        break;
                    }
                },
                Err(e) => {
                    // Undecodable bytes can never apply; drop and move on.
                    warn!(event_id = id, error = %e, "dropping malformed lifecycle event");
                    self.consumer.ack(id);
                    processed += 1;
                }
            }
        }

        processed
    }

    /// Run until shutdown is signaled.
    pub async fn run(&mut self) {
        info!("event consumer started");

        while !self.shutdown.load(Ordering::SeqCst) {
            let processed = self.drain_available();

            if processed == 0 {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        info!("event consumer stopped");
    }

    /// Signal graceful shutdown.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: self.shutdown.clone(),
        }
    }
}

/// Handle for stopping a background loop.
#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub(crate) fn from_flag(shutdown: Arc<AtomicBool>) -> Self {
        Self { shutdown }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardflow_core::{CardDraft, CardId, Flashcard};
    use cardflow_log::EventLog;
    use cardflow_sqlite::SqliteStore;
    use chrono::Utc;

    fn applier() -> (EventApplier, CommitQueue, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let queue = store.commit_queue();
        let applier = EventApplier::new(queue.clone(), store.clone(), Duration::from_secs(3600));
        (applier, queue, store)
    }

    fn staged_card() -> Flashcard {
        Flashcard::staged(CardId::mint(), "u1", "s1", CardDraft::new("q", "a"))
    }

    #[test]
    fn test_created_schedules_pending_commit() {
        let (applier, queue, _store) = applier();
        let card = staged_card();
        let key = card.id.key();

        applier.apply(&LifecycleEvent::created(card)).unwrap();
        assert!(queue.has_pending(&key).unwrap());
    }

    #[test]
    fn test_created_applied_twice_keeps_one_intent() {
        let (applier, queue, _store) = applier();
        let event = LifecycleEvent::created(staged_card());

        applier.apply(&event).unwrap();
        applier.apply(&event).unwrap();

        assert!(queue.has_pending(&event.card_id.key()).unwrap());
        let far_future = Utc::now() + ChronoDuration::days(1);
        assert_eq!(queue.due(far_future).unwrap().len(), 1);
    }

    #[test]
    fn test_deleted_before_commit_records_tombstone() {
        let (applier, queue, _store) = applier();
        let card = staged_card();
        let key = card.id.key();

        applier.apply(&LifecycleEvent::created(card.clone())).unwrap();
        applier
            .apply(&LifecycleEvent::deleted("u1", card.id))
            .unwrap();

        assert!(queue.is_tombstoned(&key).unwrap());
        assert!(!queue.has_pending(&key).unwrap());
    }

    #[test]
    fn test_created_after_tombstone_is_discarded() {
        let (applier, queue, _store) = applier();
        let card = staged_card();
        let key = card.id.key();

        applier
            .apply(&LifecycleEvent::deleted("u1", card.id.clone()))
            .unwrap();
        applier.apply(&LifecycleEvent::created(card)).unwrap();

        assert!(!queue.has_pending(&key).unwrap());
    }

    #[test]
    fn test_deleted_for_committed_card_is_noop() {
        let (applier, queue, store) = applier();
        use cardflow_core::DurableStore;

        let card = staged_card().into_committed();
        store.upsert(&card).unwrap();

        applier
            .apply(&LifecycleEvent::deleted("u1", card.id.clone()))
            .unwrap();

        // No tombstone: the direct delete path owns committed cards.
        assert!(!queue.is_tombstoned(&card.id.key()).unwrap());
        assert!(store.get(&card.id.key()).unwrap().is_some());
    }

    #[test]
    fn test_consumer_drops_malformed_events() {
        let (applier, queue, _store) = applier();
        let log = EventLog::new();

        log.append(b"not json").unwrap();
        let card = staged_card();
        let key = card.id.key();
        log.append(&LifecycleEvent::created(card).to_bytes().unwrap())
            .unwrap();

        let mut consumer =
            EventConsumer::new(log.subscribe("c1"), applier, Duration::from_millis(10));
        assert_eq!(consumer.drain_available(), 2);
        // The malformed event did not block the one behind it
        assert!(queue.has_pending(&key).unwrap());
        assert_eq!(log.consumer_info("c1").lag, 0);
    }

    #[test]
    fn test_payloadless_create_does_not_wedge_consumer() {
        let (applier, queue, _store) = applier();
        let log = EventLog::new();

        // Decodes fine but can never apply: a Created with no card content
        let mut bad = LifecycleEvent::created(staged_card());
        bad.payload = None;
        log.append(&bad.to_bytes().unwrap()).unwrap();

        let card = staged_card();
        let key = card.id.key();
        log.append(&LifecycleEvent::created(card).to_bytes().unwrap())
            .unwrap();

        let mut consumer =
            EventConsumer::new(log.subscribe("c1"), applier, Duration::from_millis(10));
        assert_eq!(consumer.drain_available(), 2);

        // The invalid event was dropped, the valid one behind it applied
        assert!(!queue.has_pending(&bad.card_id.key()).unwrap());
        assert!(queue.has_pending(&key).unwrap());
        assert_eq!(log.consumer_info("c1").lag, 0);
    }

    #[tokio::test]
    async fn test_shutdown_handle_stops_loop() {
        let (applier, _queue, _store) = applier();
        let log = EventLog::new();
        let mut consumer =
            EventConsumer::new(log.subscribe("c1"), applier, Duration::from_millis(1));
        let handle = consumer.shutdown_handle();

        let task = tokio::spawn(async move { consumer.run().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.shutdown();

        tokio::time::timeout(Duration::from_millis(500), task)
            .await
            .expect("consumer should stop")
            .expect("task should not panic");
    }
}
