use crate::store::store_err;
use cardflow_core::{Account, AccountState, AccountStore, CardflowError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

/// SQLite-backed account table.
#[derive(Clone)]
pub struct SqliteAccounts {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAccounts {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let requested: bool = row.get(2)?;
    let requested_ts: Option<i64> = row.get(3)?;
    let last_login_ts: Option<i64> = row.get(4)?;

    Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        state: if requested {
            AccountState::DeletionRequested
        } else {
            AccountState::Active
        },
        deletion_requested_at: requested_ts.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        last_login: last_login_ts.and_then(|ts| DateTime::from_timestamp(ts, 0)),
    })
}

const ACCOUNT_COLUMNS: &str =
    "account_id, username, deletion_requested, deletion_requested_at, last_login";

impl AccountStore for SqliteAccounts {
    fn insert(&self, account: &Account) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO accounts
            (account_id, username, deletion_requested, deletion_requested_at, last_login)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                account.id,
                account.username,
                account.state == AccountState::DeletionRequested,
                account.deletion_requested_at.map(|at| at.timestamp()),
                account.last_login.map(|at| at.timestamp()),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn get(&self, account_id: &str) -> Result<Option<Account>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM accounts WHERE account_id = ?",
                ACCOUNT_COLUMNS
            ),
            params![account_id],
            account_from_row,
        )
        .optional()
        .map_err(store_err)
    }

    fn request_deletion(&self, account_id: &str, requested_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                r#"
                UPDATE accounts
                SET deletion_requested = 1, deletion_requested_at = ?
                WHERE account_id = ?
                "#,
                params![requested_at.timestamp(), account_id],
            )
            .map_err(store_err)?;

        if changed == 0 {
            return Err(CardflowError::NotFound(format!(
                "account {}",
                account_id
            )));
        }
        Ok(())
    }

    fn reactivate(&self, account_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                r#"
                UPDATE accounts
                SET deletion_requested = 0, deletion_requested_at = NULL, last_login = ?
                WHERE account_id = ?
                "#,
                params![Utc::now().timestamp(), account_id],
            )
            .map_err(store_err)?;

        if changed == 0 {
            return Err(CardflowError::NotFound(format!(
                "account {}",
                account_id
            )));
        }
        Ok(())
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Account>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(&format!(
                r#"
                SELECT {} FROM accounts
                WHERE deletion_requested = 1 AND deletion_requested_at <= ?
                "#,
                ACCOUNT_COLUMNS
            ))
            .map_err(store_err)?;

        let doomed = stmt
            .query_map(params![cutoff.timestamp()], account_from_row)
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;
        drop(stmt);

        for account in &doomed {
            conn.execute(
                "DELETE FROM accounts WHERE account_id = ?",
                params![account.id],
            )
            .map_err(store_err)?;
        }

        Ok(doomed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use chrono::Duration;

    fn accounts() -> SqliteAccounts {
        SqliteStore::in_memory().unwrap().accounts()
    }

    #[test]
    fn test_insert_and_get() {
        let accounts = accounts();
        accounts.insert(&Account::new("u1", "alice")).unwrap();

        let loaded = accounts.get("u1").unwrap().unwrap();
        assert_eq!(loaded.username, "alice");
        assert_eq!(loaded.state, AccountState::Active);
    }

    #[test]
    fn test_request_deletion_marks_account() {
        let accounts = accounts();
        accounts.insert(&Account::new("u1", "alice")).unwrap();
        accounts.request_deletion("u1", Utc::now()).unwrap();

        let loaded = accounts.get("u1").unwrap().unwrap();
        assert_eq!(loaded.state, AccountState::DeletionRequested);
        assert!(loaded.deletion_requested_at.is_some());
    }

    #[test]
    fn test_request_deletion_unknown_account() {
        let accounts = accounts();
        let err = accounts.request_deletion("nope", Utc::now()).unwrap_err();
        assert!(matches!(err, CardflowError::NotFound(_)));
    }

    #[test]
    fn test_reactivate_clears_request() {
        let accounts = accounts();
        accounts.insert(&Account::new("u1", "alice")).unwrap();
        accounts.request_deletion("u1", Utc::now()).unwrap();
        accounts.reactivate("u1").unwrap();

        let loaded = accounts.get("u1").unwrap().unwrap();
        assert_eq!(loaded.state, AccountState::Active);
        assert!(loaded.deletion_requested_at.is_none());
        assert!(loaded.last_login.is_some());
    }

    #[test]
    fn test_purge_respects_cutoff() {
        let accounts = accounts();
        accounts.insert(&Account::new("old", "old")).unwrap();
        accounts.insert(&Account::new("recent", "recent")).unwrap();
        accounts.insert(&Account::new("active", "active")).unwrap();

        accounts
            .request_deletion("old", Utc::now() - Duration::days(16))
            .unwrap();
        accounts
            .request_deletion("recent", Utc::now() - Duration::days(2))
            .unwrap();

        let purged = accounts
            .purge_older_than(Utc::now() - Duration::days(15))
            .unwrap();
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].id, "old");

        assert!(accounts.get("old").unwrap().is_none());
        assert!(accounts.get("recent").unwrap().is_some());
        assert!(accounts.get("active").unwrap().is_some());
    }
}
