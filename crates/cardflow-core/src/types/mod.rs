mod account;
mod card;
mod event;

pub use account::{Account, AccountState};
pub use card::{CardDraft, CardId, CardState, Flashcard};
pub use event::{EventId, EventKind, LifecycleEvent, PendingCommit};
