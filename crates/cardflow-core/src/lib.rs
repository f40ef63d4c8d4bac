//! Cardflow core: types and contracts for the write-behind pipeline
//!
//! This crate defines the shared abstractions for an eventually consistent
//! flashcard backend:
//! - Tagged card identifiers: `Provisional(uuid)` until the delayed commit
//!   lands, `Final(key)` afterwards, same token throughout
//! - Lifecycle events (`Created` / `Deleted`) appended once, applied
//!   at-least-once with idempotent upserts
//! - Store contracts: TTL-bound ephemeral staging, durable system of record,
//!   accounts for the grace-period purge
//! - The shared error taxonomy and pipeline configuration

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::PipelineConfig;
pub use error::{CardflowError, Result};
pub use traits::{staging_key, staging_prefix, AccountStore, DurableStore, EphemeralStore};
pub use types::{
    Account, AccountState, CardDraft, CardId, CardState, EventId, EventKind, Flashcard,
    LifecycleEvent, PendingCommit,
};
