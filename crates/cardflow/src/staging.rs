//! In-memory TTL cache backing the ephemeral store contract.
//!
//! Stand-in for an external expiring key/value service. Thread-safe, with
//! lazy expiry: a dead entry is dropped the next time its key (or prefix
//! range) is touched, and never surfaces to callers.

use cardflow_core::{EphemeralStore, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct StagedEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl StagedEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// TTL-bound staging cache.
///
/// Keys are ordered, so prefix scans walk one contiguous range — cheap enough
/// to run on every read request.
pub struct StagingCache {
    entries: RwLock<BTreeMap<String, StagedEntry>>,
}

impl StagingCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StagingCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralStore for StagingCache {
    fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let entry = StagedEntry {
            value: value.to_vec(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.remove(key) {
            // An expired entry does not count as a live record
            Some(entry) => Ok(!entry.is_expired(now)),
            None => Ok(false),
        }
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let mut live = Vec::new();
        let mut dead = Vec::new();
        for (key, entry) in entries.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if entry.is_expired(now) {
                dead.push(key.clone());
            } else {
                live.push((key.clone(), entry.value.clone()));
            }
        }

        for key in dead {
            entries.remove(&key);
        }

        Ok(live)
    }
}
