use crate::types::card::{CardId, Flashcard};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event identifier - strictly monotonic u64, assigned by the log on append.
pub type EventId = u64;

/// What a lifecycle event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Deleted,
}

/// Immutable record of a client write, appended once per operation and
/// consumed at-least-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub owner_id: String,

    pub card_id: CardId,

    /// Full card content for `Created`; absent for `Deleted`.
    #[serde(default)]
    pub payload: Option<Flashcard>,

    pub kind: EventKind,

    pub emitted_at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn created(card: Flashcard) -> Self {
        Self {
            owner_id: card.owner_id.clone(),
            card_id: card.id.clone(),
            payload: Some(card),
            kind: EventKind::Created,
            emitted_at: Utc::now(),
        }
    }

    pub fn deleted(owner_id: &str, card_id: CardId) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            card_id,
            payload: None,
            kind: EventKind::Deleted,
            emitted_at: Utc::now(),
        }
    }

    pub fn to_bytes(&self) -> crate::error::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A durable delayed-commit intent.
///
/// Written by the event applier when a `Created` event is drained, fired by
/// the commit scheduler once `fire_at` has passed. Persisted so a process
/// restart between scheduling and firing drops nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCommit {
    pub card: Flashcard,
    pub fire_at: DateTime<Utc>,
}

impl PendingCommit {
    pub fn new(card: Flashcard, fire_at: DateTime<Utc>) -> Self {
        Self { card, fire_at }
    }

    pub fn card_key(&self) -> String {
        self.card.id.key()
    }
}
