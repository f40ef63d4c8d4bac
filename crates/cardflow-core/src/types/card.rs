use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Card identifier, tagged by origin.
///
/// A card is addressed by a provisional token from the moment it is staged.
/// When the delayed commit lands it in the durable store, the same token
/// becomes the durable key — the only allowed transition is
/// `Provisional -> Final`, performed by the commit scheduler. Callers match on
/// the tag rather than inferring anything from the string shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tag", content = "token")]
pub enum CardId {
    /// Minted at staging time; the externally visible id while in flight.
    Provisional(Uuid),
    /// Key under which the durable store holds the committed card.
    Final(String),
}

impl CardId {
    /// Mint a fresh provisional identifier.
    pub fn mint() -> Self {
        CardId::Provisional(Uuid::new_v4())
    }

    /// The token shared across both tags.
    ///
    /// A committed card keeps its provisional token as its durable key, so
    /// `key()` is stable across the store transition and is what read-merge
    /// deduplicates on.
    pub fn key(&self) -> String {
        match self {
            CardId::Provisional(token) => token.to_string(),
            CardId::Final(key) => key.clone(),
        }
    }

    /// Whether this id has reached its final form.
    pub fn is_final(&self) -> bool {
        matches!(self, CardId::Final(_))
    }

    /// Transition to the final form, preserving the token.
    ///
    /// Idempotent: finalizing a final id returns it unchanged.
    pub fn into_final(self) -> CardId {
        match self {
            CardId::Provisional(token) => CardId::Final(token.to_string()),
            id @ CardId::Final(_) => id,
        }
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Lifecycle state of a card.
///
/// A card visible to a reader is in exactly one state: `Staged` cards exist
/// only in the ephemeral store, `Committed` only in the durable store, and
/// `Tombstoned` marks a staged card whose delete raced ahead of its commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardState {
    Staged,
    Committed,
    Tombstoned,
}

/// A flashcard as seen by both stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: CardId,

    /// Owning user.
    pub owner_id: String,

    /// Set (collection scope) the card belongs to.
    pub set_id: String,

    pub front_text: String,

    pub back_text: String,

    /// URLs of uploaded images, if any.
    #[serde(default)]
    pub images: Vec<String>,

    /// URL of an uploaded voice recording, if any.
    #[serde(default)]
    pub voice: Option<String>,

    pub state: CardState,

    pub created_at: DateTime<Utc>,
}

impl Flashcard {
    /// Build a staged card from a validated draft.
    pub fn staged(id: CardId, owner_id: &str, set_id: &str, draft: CardDraft) -> Self {
        Self {
            id,
            owner_id: owner_id.to_string(),
            set_id: set_id.to_string(),
            front_text: draft.front_text,
            back_text: draft.back_text,
            images: draft.images,
            voice: draft.voice,
            state: CardState::Staged,
            created_at: Utc::now(),
        }
    }

    /// The committed form of this card: final id, committed state.
    pub fn into_committed(mut self) -> Self {
        self.id = self.id.into_final();
        self.state = CardState::Committed;
        self
    }
}

/// Client-supplied card content, before validation.
///
/// Media references (image/voice URLs) are produced by the upload
/// collaborators before staging begins and arrive here as opaque strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardDraft {
    pub front_text: String,
    pub back_text: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

impl CardDraft {
    pub fn new(front_text: impl Into<String>, back_text: impl Into<String>) -> Self {
        Self {
            front_text: front_text.into(),
            back_text: back_text.into(),
            images: Vec::new(),
            voice: None,
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_across_finalization() {
        let id = CardId::mint();
        let key = id.key();
        let finalized = id.into_final();
        assert!(finalized.is_final());
        assert_eq!(finalized.key(), key);
    }

    #[test]
    fn finalize_is_idempotent() {
        let id = CardId::Final("abc".to_string());
        assert_eq!(id.clone().into_final(), id);
    }

    #[test]
    fn card_id_roundtrips_through_json() {
        let id = CardId::mint();
        let json = serde_json::to_string(&id).unwrap();
        let back: CardId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn committed_card_carries_final_id() {
        let card = Flashcard::staged(CardId::mint(), "u1", "s1", CardDraft::new("a", "b"));
        assert_eq!(card.state, CardState::Staged);
        let committed = card.into_committed();
        assert_eq!(committed.state, CardState::Committed);
        assert!(committed.id.is_final());
    }
}
