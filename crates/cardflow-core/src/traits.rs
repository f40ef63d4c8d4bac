//! Contracts between the pipeline and its backing stores.
//!
//! The ephemeral store holds serialized records opaque to the storage layer
//! (decoding happens at read-merge time); the durable store is a typed
//! document contract with idempotent upsert-by-id.

use crate::error::Result;
use crate::types::{Account, Flashcard};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Keyspace for staged cards, namespaced by owning set.
pub fn staging_key(set_id: &str, card_key: &str) -> String {
    format!("card:set:{}:card:{}", set_id, card_key)
}

/// Prefix matching every staged card in a set.
pub fn staging_prefix(set_id: &str) -> String {
    format!("card:set:{}:card:", set_id)
}

/// System of record for committed cards.
///
/// `upsert` must be idempotent by key: re-applying the same commit never
/// fails on a duplicate and never produces a second record.
pub trait DurableStore: Send + Sync {
    fn upsert(&self, card: &Flashcard) -> Result<()>;

    fn get(&self, card_key: &str) -> Result<Option<Flashcard>>;

    /// Delete by key. Returns whether a record existed.
    fn delete(&self, card_key: &str) -> Result<bool>;

    /// All committed cards in a set.
    fn find_by_set(&self, set_id: &str) -> Result<Vec<Flashcard>>;
}

/// Key/value store with per-key expiration, holding cards that have not yet
/// reached the durable store.
pub trait EphemeralStore: Send + Sync {
    /// Store a serialized record under `key`, expiring after `ttl`.
    fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete by key. Returns whether a live record existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// All live records whose key starts with `prefix`.
    ///
    /// Runs once per read request, so implementations must keep this cheap.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;
}

/// Account records, as far as the purge sweep is concerned.
pub trait AccountStore: Send + Sync {
    fn insert(&self, account: &Account) -> Result<()>;

    fn get(&self, account_id: &str) -> Result<Option<Account>>;

    /// Mark the account for deletion at `requested_at`.
    fn request_deletion(&self, account_id: &str, requested_at: DateTime<Utc>) -> Result<()>;

    /// Reset to active. Called by the login collaborator, never by the sweep.
    fn reactivate(&self, account_id: &str) -> Result<()>;

    /// Hard-delete every account whose deletion request is at or before
    /// `cutoff`. Returns the purged accounts.
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Account>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_key_is_under_its_set_prefix() {
        let key = staging_key("s1", "abc");
        assert!(key.starts_with(&staging_prefix("s1")));
        assert!(!key.starts_with(&staging_prefix("s2")));
    }
}
