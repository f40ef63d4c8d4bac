//! Read-time merge of the ephemeral and durable views.
//!
//! While a write is in flight it exists only as a staged record; once
//! committed it exists durably, possibly alongside a stale staged shadow.
//! The merge makes both cases invisible to readers: one de-duplicated view,
//! durable winning every id collision.

use cardflow_core::{
    staging_prefix, CardflowError, DurableStore, EphemeralStore, Flashcard, Result,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub struct ReadMerge {
    ephemeral: Arc<dyn EphemeralStore>,
    durable: Arc<dyn DurableStore>,
}

impl ReadMerge {
    pub fn new(ephemeral: Arc<dyn EphemeralStore>, durable: Arc<dyn DurableStore>) -> Self {
        Self { ephemeral, durable }
    }

    /// All cards in a set, merged across both stores.
    ///
    /// Staged records go into the map first; durable results overwrite any
    /// colliding id, since they reflect the authoritative post-commit state.
    /// Staged records that fail to decode are dropped with a warning rather
    /// than surfaced. An empty result from both stores is `NotFound`.
    pub fn list_in_set(&self, set_id: &str) -> Result<Vec<Flashcard>> {
        let mut merged: HashMap<String, Flashcard> = HashMap::new();

        for (key, bytes) in self.ephemeral.scan_prefix(&staging_prefix(set_id))? {
            match serde_json::from_slice::<Flashcard>(&bytes) {
                Ok(card) => {
                    merged.insert(card.id.key(), card);
                }
                Err(e) => {
                    warn!(record = %key, error = %e, "dropping undecodable staged record");
                }
            }
        }

        for card in self.durable.find_by_set(set_id)? {
            merged.insert(card.id.key(), card);
        }

        if merged.is_empty() {
            return Err(CardflowError::NotFound(format!(
                "no cards in set {}",
                set_id
            )));
        }

        let mut cards: Vec<Flashcard> = merged.into_values().collect();
        cards.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.key().cmp(&b.id.key()))
        });
        Ok(cards)
    }
}
