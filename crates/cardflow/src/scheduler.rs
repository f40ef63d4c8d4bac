//! Recovery-safe delayed-commit scheduler.
//!
//! Pending commits live in SQLite, selected by fire time, so the loop picks
//! up the full backlog after a restart — nothing armed in process memory.
//! Tombstones are re-checked at fire time from the same database: a delete
//! recorded any time inside the grace window suppresses the commit.

use cardflow_core::{staging_key, CardflowError, DurableStore, EphemeralStore, Result};
use cardflow_sqlite::CommitQueue;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct CommitScheduler {
    queue: CommitQueue,
    durable: Arc<dyn DurableStore>,
    ephemeral: Arc<dyn EphemeralStore>,
    poll_interval: Duration,
    tombstone_retention: Duration,
    shutdown: Arc<AtomicBool>,
}

impl CommitScheduler {
    pub fn new(
        queue: CommitQueue,
        durable: Arc<dyn DurableStore>,
        ephemeral: Arc<dyn EphemeralStore>,
        poll_interval: Duration,
        tombstone_retention: Duration,
    ) -> Self {
        Self {
            queue,
            durable,
            ephemeral,
            poll_interval,
            tombstone_retention,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fire every pending commit due at `now`. Returns how many cards landed
    /// in the durable store.
    ///
    /// Ordering per intent: upsert, then drop the pending row, then clean the
    /// ephemeral shadow. A crash between upsert and row removal re-runs an
    /// idempotent upsert on the next pass — never a duplicate, never a loss.
    pub fn process_due(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut committed = 0;

        for pending in self.queue.due(now)? {
            let key = pending.card_key();

            if self.queue.is_tombstoned(&key)? {
                // The tombstone outlives the intent: a redelivered create
                // must find it and stay suppressed.
                self.queue.remove(&key)?;
                info!(card = %key, "pending commit suppressed by tombstone");
                continue;
            }

            let set_id = pending.card.set_id.clone();
            let card = pending.card.into_committed();
            self.durable.upsert(&card)?;
            self.queue.remove(&key)?;

            // The staged record is now a stale shadow; reads would still
            // resolve correctly (durable wins), so cleanup is best-effort.
            if let Err(e) = self.ephemeral.delete(&staging_key(&set_id, &key)) {
                warn!(card = %key, error = %e, "failed to clean up staged shadow");
            }

            debug!(card = %key, "card committed");
            committed += 1;
        }

        // A tombstone past the retention window can no longer meet a
        // redelivered create; drop it so the table stays bounded.
        let retention = ChronoDuration::from_std(self.tombstone_retention)
            .map_err(|e| CardflowError::Config(e.to_string()))?;
        let pruned = self.queue.prune_tombstones(now - retention)?;
        if pruned > 0 {
            debug!(pruned, "stale tombstones dropped");
        }

        Ok(committed)
    }

    /// Run the scheduler loop until shutdown is signaled.
    pub async fn run(&self) {
        info!("commit scheduler started");

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.process_due(Utc::now()) {
                Ok(0) => tokio::time::sleep(self.poll_interval).await,
                Ok(n) => debug!(committed = n, "scheduler pass complete"),
                Err(e) => {
                    // Rows stay queued; retry after the interval.
                    error!(error = %e, "scheduler pass failed");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        info!("commit scheduler stopped");
    }

    /// Signal graceful shutdown.
    pub fn shutdown_handle(&self) -> crate::applier::ShutdownHandle {
        crate::applier::ShutdownHandle::from_flag(self.shutdown.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::StagingCache;
    use cardflow_core::{CardDraft, CardId, CardState, Flashcard, PendingCommit};
    use cardflow_sqlite::SqliteStore;
    use chrono::Duration as ChronoDuration;

    fn scheduler() -> (CommitScheduler, CommitQueue, Arc<SqliteStore>, Arc<StagingCache>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let staging = Arc::new(StagingCache::new());
        let queue = store.commit_queue();
        let scheduler = CommitScheduler::new(
            queue.clone(),
            store.clone(),
            staging.clone(),
            Duration::from_millis(10),
            Duration::from_secs(2 * 3600),
        );
        (scheduler, queue, store, staging)
    }

    fn staged_card() -> Flashcard {
        Flashcard::staged(CardId::mint(), "u1", "s1", CardDraft::new("q", "a"))
    }

    #[test]
    fn test_due_commit_lands_with_final_id() {
        use cardflow_core::DurableStore;
        let (scheduler, queue, store, _staging) = scheduler();

        let card = staged_card();
        let key = card.id.key();
        queue
            .enqueue(&PendingCommit::new(card, Utc::now() - ChronoDuration::seconds(1)))
            .unwrap();

        assert_eq!(scheduler.process_due(Utc::now()).unwrap(), 1);

        let committed = store.get(&key).unwrap().expect("card committed");
        assert!(committed.id.is_final());
        assert_eq!(committed.state, CardState::Committed);
        assert!(!queue.has_pending(&key).unwrap());
    }

    #[test]
    fn test_not_yet_due_commit_stays_queued() {
        let (scheduler, queue, _store, _staging) = scheduler();

        let card = staged_card();
        let key = card.id.key();
        queue
            .enqueue(&PendingCommit::new(card, Utc::now() + ChronoDuration::seconds(3600)))
            .unwrap();

        assert_eq!(scheduler.process_due(Utc::now()).unwrap(), 0);
        assert!(queue.has_pending(&key).unwrap());
    }

    #[test]
    fn test_tombstoned_commit_is_suppressed() {
        use cardflow_core::DurableStore;
        let (scheduler, queue, store, _staging) = scheduler();

        let card = staged_card();
        let key = card.id.key();
        queue
            .enqueue(&PendingCommit::new(card, Utc::now() - ChronoDuration::seconds(1)))
            .unwrap();
        queue.record_tombstone(&key, Utc::now()).unwrap();

        assert_eq!(scheduler.process_due(Utc::now()).unwrap(), 0);
        assert!(store.get(&key).unwrap().is_none());
        assert!(!queue.has_pending(&key).unwrap());
        // The tombstone survives to suppress redelivered creates
        assert!(queue.is_tombstoned(&key).unwrap());
    }

    #[test]
    fn test_commit_cleans_up_staged_shadow() {
        use cardflow_core::EphemeralStore;
        let (scheduler, queue, _store, staging) = scheduler();

        let card = staged_card();
        let key = staging_key(&card.set_id, &card.id.key());
        staging
            .put(&key, &serde_json::to_vec(&card).unwrap(), Duration::from_secs(60))
            .unwrap();
        queue
            .enqueue(&PendingCommit::new(card, Utc::now() - ChronoDuration::seconds(1)))
            .unwrap();

        scheduler.process_due(Utc::now()).unwrap();
        assert!(staging.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_tombstones_are_pruned_after_retention() {
        let (scheduler, queue, _store, _staging) = scheduler();

        queue
            .record_tombstone("stale", Utc::now() - ChronoDuration::hours(5))
            .unwrap();
        queue.record_tombstone("fresh", Utc::now()).unwrap();

        scheduler.process_due(Utc::now()).unwrap();

        // Past the window the create can no longer be redelivered; inside it
        // the tombstone must stay armed
        assert!(!queue.is_tombstoned("stale").unwrap());
        assert!(queue.is_tombstoned("fresh").unwrap());
    }

    #[test]
    fn test_process_due_is_idempotent() {
        let (scheduler, queue, _store, _staging) = scheduler();

        queue
            .enqueue(&PendingCommit::new(
                staged_card(),
                Utc::now() - ChronoDuration::seconds(1),
            ))
            .unwrap();

        assert_eq!(scheduler.process_due(Utc::now()).unwrap(), 1);
        assert_eq!(scheduler.process_due(Utc::now()).unwrap(), 0);
    }
}
