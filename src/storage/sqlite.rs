//! SQLite persistence for users and the round history log.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     canonical_key TEXT PRIMARY KEY,
//!     display_name  TEXT NOT NULL,
//!     price         TEXT NOT NULL,
//!     balance       TEXT NOT NULL
//! ) WITHOUT ROWID;
//!
//! -- Append-only audit log; rows are only ever inserted or bulk-deleted.
//! CREATE TABLE history (
//!     id           INTEGER PRIMARY KEY AUTOINCREMENT,
//!     timestamp    TEXT NOT NULL,
//!     payer        TEXT NOT NULL,
//!     amount       TEXT NOT NULL,
//!     participants TEXT NOT NULL
//! );
//! ```
//!
//! Money columns hold decimal strings, never floats. Participants are stored
//! pipe-delimited; names cannot contain `|` by validation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::ledger::error::LedgerError;
use crate::ledger::executor::RoundOutcome;
use crate::models::{HistoryEntry, LedgerState, User};
use crate::money::zero;

const SCHEMA_VERSION: u32 = 1;

const PARTICIPANT_SEPARATOR: char = '|';

/// SQLite-backed ledger persistence.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// The returned flag is true when the file did not exist beforehand; the
    /// caller uses it to decide whether to seed default users. An existing
    /// but empty database is not "fresh" and must never be reseeded.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<(Self, bool), LedgerError> {
        let fresh = !path.as_ref().exists();
        let conn = Connection::open(&path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        if fresh {
            info!(path = %path.as_ref().display(), "Created ledger database");
        }
        Ok((store, fresh))
    }

    /// In-memory store for tests. Counts as fresh.
    pub fn in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), LedgerError> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                canonical_key TEXT PRIMARY KEY,
                display_name  TEXT NOT NULL,
                price         TEXT NOT NULL,
                balance       TEXT NOT NULL
            ) WITHOUT ROWID",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp    TEXT NOT NULL,
                payer        TEXT NOT NULL,
                amount       TEXT NOT NULL,
                participants TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;

        debug!("Ledger schema at v{}", SCHEMA_VERSION);
        Ok(())
    }

    /// Load the full ledger state.
    pub fn load(&self) -> Result<LedgerState, LedgerError> {
        let conn = self.conn.lock();
        let mut state = LedgerState::default();

        let mut stmt =
            conn.prepare("SELECT canonical_key, display_name, price, balance FROM users")?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let display_name: String = row.get(1)?;
            let price = decimal_column(row.get::<_, String>(2)?, 2)?;
            let balance = decimal_column(row.get::<_, String>(3)?, 3)?;
            Ok((
                key,
                User {
                    display_name,
                    price,
                    balance,
                },
            ))
        })?;
        for row in rows {
            let (key, user) = row?;
            state.users.insert(key, user);
        }

        let mut stmt = conn.prepare(
            "SELECT timestamp, payer, amount, participants FROM history ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let timestamp = timestamp_column(row.get::<_, String>(0)?)?;
            let payer: String = row.get(1)?;
            let amount = decimal_column(row.get::<_, String>(2)?, 2)?;
            let participants: String = row.get(3)?;
            Ok(HistoryEntry {
                timestamp,
                payer,
                amount,
                participants: if participants.is_empty() {
                    Vec::new()
                } else {
                    participants
                        .split(PARTICIPANT_SEPARATOR)
                        .map(str::to_string)
                        .collect()
                },
            })
        })?;
        for row in rows {
            state.history.push(row?);
        }

        Ok(state)
    }

    /// Insert or replace a user record.
    pub fn upsert_user(&self, key: &str, user: &User) -> Result<(), LedgerError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (canonical_key, display_name, price, balance)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(canonical_key) DO UPDATE SET
                 display_name = excluded.display_name,
                 price = excluded.price,
                 balance = excluded.balance",
            params![
                key,
                user.display_name,
                user.price.to_string(),
                user.balance.to_string()
            ],
        )?;
        Ok(())
    }

    /// Delete a user. No-op when absent.
    pub fn delete_user(&self, key: &str) -> Result<(), LedgerError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM users WHERE canonical_key = ?1", params![key])?;
        Ok(())
    }

    /// Zero every balance; optionally purge the history log in the same
    /// transaction.
    pub fn reset_balances(&self, clear_history: bool) -> Result<(), LedgerError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("UPDATE users SET balance = ?1", params![zero().to_string()])?;
        if clear_history {
            tx.execute("DELETE FROM history", [])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Purge all history rows. Idempotent; the schema stays in place.
    pub fn clear_history(&self) -> Result<(), LedgerError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM history", [])?;
        Ok(())
    }

    /// Persist a planned round: balance updates plus exactly one history row,
    /// atomically.
    pub fn apply_round(&self, outcome: &RoundOutcome) -> Result<(), LedgerError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for (key, balance) in &outcome.new_balances {
            tx.execute(
                "UPDATE users SET balance = ?1 WHERE canonical_key = ?2",
                params![balance.to_string(), key],
            )?;
        }
        tx.execute(
            "INSERT INTO history (timestamp, payer, amount, participants)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                outcome.entry.timestamp.to_rfc3339(),
                outcome.entry.payer,
                outcome.entry.amount.to_string(),
                outcome
                    .entry
                    .participants
                    .join(&PARTICIPANT_SEPARATOR.to_string()),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn decimal_column(raw: String, idx: usize) -> Result<Decimal, rusqlite::Error> {
    Decimal::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn timestamp_column(raw: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}
