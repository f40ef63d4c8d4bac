use crate::accounts::SqliteAccounts;
use crate::queue::CommitQueue;
use crate::schema;
use cardflow_core::{CardId, CardState, CardflowError, DurableStore, Flashcard, Result};
use chrono::DateTime;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;

pub(crate) fn store_err(e: rusqlite::Error) -> CardflowError {
    CardflowError::StoreUnavailable(e.to_string())
}

/// SQLite-backed system of record.
///
/// Owns the connection; the commit queue and account table hand out handles
/// sharing it. The connection is built once at process start and injected —
/// there is no lazy connect.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(store_err)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store. Useful for tests; state dies with the handle.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::configure(&conn)?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Handle to the persisted pending-commit queue sharing this connection.
    pub fn commit_queue(&self) -> CommitQueue {
        CommitQueue::new(self.conn.clone())
    }

    /// Handle to the account table sharing this connection.
    pub fn accounts(&self) -> SqliteAccounts {
        SqliteAccounts::new(self.conn.clone())
    }

    /// The underlying connection (for migrations and custom queries).
    pub fn conn(&self) -> &Arc<Mutex<Connection>> {
        &self.conn
    }
}

pub(crate) fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Flashcard> {
    let card_key: String = row.get(0)?;
    let images_json: String = row.get(5)?;
    let created_ts: i64 = row.get(7)?;

    Ok(Flashcard {
        id: CardId::Final(card_key),
        owner_id: row.get(1)?,
        set_id: row.get(2)?,
        front_text: row.get(3)?,
        back_text: row.get(4)?,
        images: serde_json::from_str(&images_json).unwrap_or_default(),
        voice: row.get(6)?,
        state: CardState::Committed,
        created_at: DateTime::from_timestamp(created_ts, 0).unwrap_or_default(),
    })
}

const CARD_COLUMNS: &str =
    "card_key, owner_id, set_id, front_text, back_text, images, voice, created_at";

impl DurableStore for SqliteStore {
    fn upsert(&self, card: &Flashcard) -> Result<()> {
        let images = serde_json::to_string(&card.images)?;
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO cards
            (card_key, owner_id, set_id, front_text, back_text, images, voice, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(card_key) DO UPDATE SET
                owner_id = excluded.owner_id,
                set_id = excluded.set_id,
                front_text = excluded.front_text,
                back_text = excluded.back_text,
                images = excluded.images,
                voice = excluded.voice,
                created_at = excluded.created_at
            "#,
            params![
                card.id.key(),
                card.owner_id,
                card.set_id,
                card.front_text,
                card.back_text,
                images,
                card.voice,
                card.created_at.timestamp(),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn get(&self, card_key: &str) -> Result<Option<Flashcard>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM cards WHERE card_key = ?", CARD_COLUMNS),
            params![card_key],
            card_from_row,
        )
        .optional()
        .map_err(store_err)
    }

    fn delete(&self, card_key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn
            .execute("DELETE FROM cards WHERE card_key = ?", params![card_key])
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    fn find_by_set(&self, set_id: &str) -> Result<Vec<Flashcard>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM cards WHERE set_id = ? ORDER BY created_at ASC",
                CARD_COLUMNS
            ))
            .map_err(store_err)?;

        let cards = stmt
            .query_map(params![set_id], card_from_row)
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;

        Ok(cards)
    }
}
