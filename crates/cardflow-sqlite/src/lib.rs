//! SQLite persistence for cardflow.
//!
//! One connection, three concerns:
//! - `cards`: the system of record, idempotent upsert-by-key
//! - `pending_commits` + `tombstones`: the durable write-behind bookkeeping,
//!   so delayed commits survive a process restart
//! - `accounts`: the grace-period purge table

pub mod accounts;
pub mod queue;
pub mod schema;
pub mod store;

pub use accounts::SqliteAccounts;
pub use queue::CommitQueue;
pub use store::SqliteStore;
