//! Persistence backend for the ledger.

pub mod sqlite;

pub use sqlite::SqliteStore;
