//! # Cardflow
//!
//! Eventual-consistency write-behind pipeline for a flashcard backend.
//!
//! A created card is staged in a TTL-bound ephemeral store and its `Created`
//! event appended to an ordered log; the caller gets a provisional id back
//! immediately. A consumer drains the log into persisted commit intents, and
//! a scheduler fires each intent after a grace delay, upserting the card into
//! the durable store under the same token it was minted with. A delete inside
//! the grace window records a tombstone that suppresses the commit. Reads
//! merge both stores, durable winning id collisions.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cardflow::{Cardflow, CardDraft, PipelineConfig};
//!
//! let flow = Cardflow::in_memory(PipelineConfig::default()).unwrap();
//!
//! let id = flow
//!     .stage_create("user-1", "set-1", CardDraft::new("front", "back"))
//!     .unwrap();
//!
//! // Visible immediately from the staged copy, durable only after the
//! // background consumer and scheduler have run.
//! let cards = flow.list_in_set("set-1").unwrap();
//! assert_eq!(cards[0].id, id);
//! ```

pub mod applier;
pub mod merge;
pub mod pipeline;
pub mod purge;
pub mod scheduler;
pub mod staging;

pub use applier::{EventApplier, EventConsumer, ShutdownHandle};
pub use merge::ReadMerge;
pub use pipeline::{DeleteOutcome, WriteBehind};
pub use purge::PurgeSweep;
pub use scheduler::CommitScheduler;
pub use staging::StagingCache;

pub use cardflow_core::{
    Account, AccountState, AccountStore, CardDraft, CardId, CardState, CardflowError,
    DurableStore, EphemeralStore, Flashcard, LifecycleEvent, PipelineConfig, Result,
};
pub use cardflow_log::{Consumer, EventLog};
pub use cardflow_sqlite::{CommitQueue, SqliteAccounts, SqliteStore};

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Consumer name under which the commit pipeline subscribes to the log.
const COMMITTER: &str = "committer";

/// Top-level handle wiring the whole pipeline together.
///
/// Owns the stores, the event log, and the client-facing operations. The
/// background loops are not started here: call [`Cardflow::event_consumer`],
/// [`Cardflow::commit_scheduler`] and [`Cardflow::purge_sweep`] and spawn
/// their `run` futures on your runtime.
pub struct Cardflow {
    config: PipelineConfig,
    staging: Arc<StagingCache>,
    store: Arc<SqliteStore>,
    log: EventLog,
    pipeline: WriteBehind,
    merge: ReadMerge,
}

impl Cardflow {
    /// Open (or create) a pipeline persisted under the given directory.
    pub fn open<P: AsRef<Path>>(path: P, config: PipelineConfig) -> Result<Self> {
        fs::create_dir_all(path.as_ref())?;
        let store = SqliteStore::open(path.as_ref().join("cardflow.db"))?;
        info!(path = %path.as_ref().display(), "cardflow opened");
        Ok(Self::assemble(store, config))
    }

    /// Fully in-memory pipeline. Nothing survives the handle.
    pub fn in_memory(config: PipelineConfig) -> Result<Self> {
        Ok(Self::assemble(SqliteStore::in_memory()?, config))
    }

    fn assemble(store: SqliteStore, config: PipelineConfig) -> Self {
        let staging = Arc::new(StagingCache::new());
        let store = Arc::new(store);
        let log = EventLog::new();

        let pipeline = WriteBehind::new(
            staging.clone() as Arc<dyn EphemeralStore>,
            store.clone() as Arc<dyn DurableStore>,
            log.clone(),
            config.clone(),
        );
        let merge = ReadMerge::new(
            staging.clone() as Arc<dyn EphemeralStore>,
            store.clone() as Arc<dyn DurableStore>,
        );

        Self {
            config,
            staging,
            store,
            log,
            pipeline,
            merge,
        }
    }

    /// Stage a card; returns its provisional id once the write is accepted.
    pub fn stage_create(&self, owner_id: &str, set_id: &str, draft: CardDraft) -> Result<CardId> {
        self.pipeline.stage_create(owner_id, set_id, draft)
    }

    /// Delete a card from whichever stores currently hold it.
    pub fn stage_delete(
        &self,
        owner_id: &str,
        set_id: &str,
        card_id: &CardId,
    ) -> Result<DeleteOutcome> {
        self.pipeline.stage_delete(owner_id, set_id, card_id)
    }

    /// All cards in a set, staged and committed merged into one view.
    pub fn list_in_set(&self, set_id: &str) -> Result<Vec<Flashcard>> {
        self.merge.list_in_set(set_id)
    }

    /// Build the consumer that drains lifecycle events into commit intents.
    pub fn event_consumer(&self) -> EventConsumer {
        let applier = EventApplier::new(
            self.store.commit_queue(),
            self.store.clone() as Arc<dyn DurableStore>,
            self.config.commit_delay,
        );
        EventConsumer::new(
            self.log.subscribe(COMMITTER),
            applier,
            self.config.consumer_poll_interval,
        )
    }

    /// Build the scheduler that fires due commits against the durable store.
    pub fn commit_scheduler(&self) -> CommitScheduler {
        CommitScheduler::new(
            self.store.commit_queue(),
            self.store.clone() as Arc<dyn DurableStore>,
            self.staging.clone() as Arc<dyn EphemeralStore>,
            self.config.scheduler_poll_interval,
            self.config.tombstone_retention,
        )
    }

    /// Build the sweep that purges accounts past the retention window.
    pub fn purge_sweep(&self) -> PurgeSweep {
        PurgeSweep::new(
            Arc::new(self.store.accounts()) as Arc<dyn AccountStore>,
            self.config.purge_retention,
            self.config.purge_interval,
        )
    }

    /// Account table handle.
    pub fn accounts(&self) -> SqliteAccounts {
        self.store.accounts()
    }

    /// The lifecycle event log.
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// The durable store.
    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    /// The ephemeral staging cache.
    pub fn staging(&self) -> &Arc<StagingCache> {
        &self.staging
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stop accepting new writes. Events already appended stay drainable, so
    /// background loops can finish their backlog before being shut down.
    pub fn close(&self) {
        self.log.close();
        info!("cardflow closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_stage_and_list() {
        let flow = Cardflow::in_memory(PipelineConfig::default()).unwrap();

        let id = flow
            .stage_create("u1", "s1", CardDraft::new("front", "back"))
            .unwrap();

        let cards = flow.list_in_set("s1").unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, id);
        assert_eq!(cards[0].state, CardState::Staged);
    }

    #[test]
    fn test_close_rejects_new_writes() {
        let flow = Cardflow::in_memory(PipelineConfig::default()).unwrap();
        flow.close();

        let err = flow
            .stage_create("u1", "s1", CardDraft::new("front", "back"))
            .unwrap_err();
        assert!(matches!(err, CardflowError::Publish(_)));
    }
}
