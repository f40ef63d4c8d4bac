//! Client-facing staging operations of the write-behind pipeline.
//!
//! A create is accepted once it is staged in the ephemeral store and its
//! `Created` event is on the log; the durable commit happens later, out of
//! the request path. A delete removes whatever physical copies exist and
//! leaves a `Deleted` event behind to cancel any commit still in flight.

use cardflow_core::{
    staging_key, CardDraft, CardId, CardflowError, DurableStore, EphemeralStore, Flashcard,
    LifecycleEvent, PipelineConfig, Result,
};
use cardflow_log::EventLog;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which stores a delete actually touched.
///
/// A partial hit is a success; only a miss in both stores is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Card removed from the system of record.
    pub removed_durable: bool,
    /// Staged record removed from the ephemeral store.
    pub removed_ephemeral: bool,
}

/// Staging side of the write-behind pipeline.
pub struct WriteBehind {
    ephemeral: Arc<dyn EphemeralStore>,
    durable: Arc<dyn DurableStore>,
    log: EventLog,
    config: PipelineConfig,
}

impl WriteBehind {
    pub fn new(
        ephemeral: Arc<dyn EphemeralStore>,
        durable: Arc<dyn DurableStore>,
        log: EventLog,
        config: PipelineConfig,
    ) -> Self {
        Self {
            ephemeral,
            durable,
            log,
            config,
        }
    }

    /// Stage a card for eventual durable storage.
    ///
    /// Validates before any I/O, writes the ephemeral record, then publishes
    /// the `Created` event — in that order, so a fast consumer can always
    /// resolve staged data. Returns the provisional id once both succeeded:
    /// the write is accepted, not yet durable.
    ///
    /// If publication fails after staging, the staged record is removed
    /// best-effort and the whole operation fails: a record whose event never
    /// made the log would otherwise linger until TTL expiry and never commit.
    pub fn stage_create(&self, owner_id: &str, set_id: &str, draft: CardDraft) -> Result<CardId> {
        if draft.front_text.trim().is_empty() || draft.back_text.trim().is_empty() {
            return Err(CardflowError::Validation(
                "both front_text and back_text are required".to_string(),
            ));
        }

        let id = CardId::mint();
        let card = Flashcard::staged(id.clone(), owner_id, set_id, draft);
        let key = staging_key(set_id, &id.key());

        let record = serde_json::to_vec(&card)?;
        let event_bytes = LifecycleEvent::created(card).to_bytes()?;

        self.ephemeral.put(&key, &record, self.config.stage_ttl)?;

        match self.log.append(&event_bytes) {
            Ok(event_id) => {
                debug!(card = %id, event_id, "card staged and queued for commit");
                Ok(id)
            }
            Err(publish_err) => {
                if let Err(e) = self.ephemeral.delete(&key) {
                    warn!(card = %id, error = %e, "failed to unstage after publish failure");
                }
                Err(publish_err)
            }
        }
    }

    /// Delete a card wherever it currently lives.
    ///
    /// Checks the durable store and the ephemeral store independently; absent
    /// from both is `NotFound`. The `Deleted` event is published after the
    /// physical deletes and best-effort only — its sole purpose is to
    /// suppress a commit that may still be pending, so a publish failure does
    /// not undo an otherwise complete delete.
    pub fn stage_delete(
        &self,
        owner_id: &str,
        set_id: &str,
        card_id: &CardId,
    ) -> Result<DeleteOutcome> {
        let token = card_id.key();

        let removed_durable = self.durable.delete(&token)?;
        let removed_ephemeral = self.ephemeral.delete(&staging_key(set_id, &token))?;

        if !removed_durable && !removed_ephemeral {
            return Err(CardflowError::NotFound(format!(
                "card {} absent from both stores",
                token
            )));
        }

        let event = LifecycleEvent::deleted(owner_id, card_id.clone());
        match event.to_bytes().and_then(|bytes| self.log.append(&bytes)) {
            Ok(event_id) => debug!(card = %token, event_id, "delete event published"),
            Err(e) => warn!(card = %token, error = %e, "delete completed but event publish failed"),
        }

        Ok(DeleteOutcome {
            removed_durable,
            removed_ephemeral,
        })
    }
}
