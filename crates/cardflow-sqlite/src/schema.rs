//! Table definitions for the system of record and the write-behind bookkeeping.

use cardflow_core::{CardflowError, Result};
use rusqlite::Connection;

/// Initialize the database schema.
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS cards (
            card_key TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            set_id TEXT NOT NULL,
            front_text TEXT NOT NULL,
            back_text TEXT NOT NULL,
            images TEXT NOT NULL DEFAULT '[]',
            voice TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cards_set_id
            ON cards(set_id);

        CREATE TABLE IF NOT EXISTS pending_commits (
            card_key TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            payload BLOB NOT NULL,
            fire_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_pending_commits_fire_at
            ON pending_commits(fire_at);

        CREATE TABLE IF NOT EXISTS tombstones (
            card_key TEXT PRIMARY KEY,
            recorded_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS accounts (
            account_id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            deletion_requested INTEGER NOT NULL DEFAULT 0,
            deletion_requested_at INTEGER,
            last_login INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_accounts_deletion
            ON accounts(deletion_requested, deletion_requested_at);
        "#,
    )
    .map_err(|e| CardflowError::StoreUnavailable(e.to_string()))?;

    Ok(())
}

/// Configure a freshly opened connection.
pub fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| CardflowError::Config(e.to_string()))?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(|e| CardflowError::Config(e.to_string()))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| CardflowError::Config(e.to_string()))?;
    Ok(())
}
