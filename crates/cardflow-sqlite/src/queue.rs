//! Persisted delayed-commit queue and tombstone table.
//!
//! The original write-behind design armed an in-process timer per create,
//! which a restart silently dropped. Here the commit intent is a row selected
//! by `fire_at <= now`, so the scheduler loop recovers the full backlog on
//! startup, and tombstones are consulted from the same database rather than
//! from process memory.

use crate::store::store_err;
use cardflow_core::{CardflowError, Flashcard, PendingCommit, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;

/// Handle to the pending-commit and tombstone tables.
#[derive(Clone)]
pub struct CommitQueue {
    conn: Arc<Mutex<Connection>>,
}

impl CommitQueue {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Record (or refresh) a delayed-commit intent.
    ///
    /// Keyed by card, so redelivering the same `Created` event overwrites the
    /// existing row instead of duplicating it.
    pub fn enqueue(&self, pending: &PendingCommit) -> Result<()> {
        let payload = serde_json::to_vec(&pending.card)?;
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO pending_commits (card_key, owner_id, payload, fire_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(card_key) DO UPDATE SET
                owner_id = excluded.owner_id,
                payload = excluded.payload,
                fire_at = excluded.fire_at
            "#,
            params![
                pending.card_key(),
                pending.card.owner_id,
                payload,
                pending.fire_at.timestamp(),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    /// All intents whose fire time has passed, oldest first.
    pub fn due(&self, now: DateTime<Utc>) -> Result<Vec<PendingCommit>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT payload, fire_at
                FROM pending_commits
                WHERE fire_at <= ?
                ORDER BY fire_at ASC
                "#,
            )
            .map_err(store_err)?;

        let rows = stmt
            .query_map(params![now.timestamp()], |row| {
                let payload: Vec<u8> = row.get(0)?;
                let fire_ts: i64 = row.get(1)?;
                Ok((payload, fire_ts))
            })
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;

        let mut due = Vec::with_capacity(rows.len());
        for (payload, fire_ts) in rows {
            let card: Flashcard = serde_json::from_slice(&payload)?;
            let fire_at = DateTime::from_timestamp(fire_ts, 0).ok_or_else(|| {
                CardflowError::InvalidState(format!("bad fire_at timestamp {}", fire_ts))
            })?;
            due.push(PendingCommit::new(card, fire_at));
        }
        Ok(due)
    }

    /// Drop an intent. Returns whether one existed.
    pub fn remove(&self, card_key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "DELETE FROM pending_commits WHERE card_key = ?",
                params![card_key],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    /// Whether an intent is queued for this card.
    pub fn has_pending(&self, card_key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM pending_commits WHERE card_key = ?",
                params![card_key],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        Ok(found.is_some())
    }

    /// Record that a delete raced ahead of this card's commit.
    pub fn record_tombstone(&self, card_key: &str, recorded_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO tombstones (card_key, recorded_at) VALUES (?, ?)",
            params![card_key, recorded_at.timestamp()],
        )
        .map_err(store_err)?;
        Ok(())
    }

    pub fn is_tombstoned(&self, card_key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM tombstones WHERE card_key = ?",
                params![card_key],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        Ok(found.is_some())
    }

    /// Drop every tombstone recorded at or before `cutoff`. Returns how many
    /// were removed.
    ///
    /// A tombstone only has work to do while its `Created` event can still be
    /// redelivered, so anything older than the commit delay plus consumer-lag
    /// headroom is garbage. Without pruning the table grows for the life of
    /// the database.
    pub fn prune_tombstones(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "DELETE FROM tombstones WHERE recorded_at <= ?",
                params![cutoff.timestamp()],
            )
            .map_err(store_err)?;
        Ok(changed)
    }
}
