//! Ledger error taxonomy.
//!
//! All mutation failures leave state unchanged; the API layer maps these onto
//! HTTP status codes (validation -> 400, conflict -> 409, not-found -> 404,
//! storage -> 500).

#[derive(Debug)]
pub enum LedgerError {
    /// Bad input: invalid price or name, unknown tie strategy, empty or
    /// unknown candidate set.
    Validation(String),
    /// Case-duplicate name when the conflict policy rejects.
    Conflict(String),
    /// Internal lookup miss. Never surfaced for deletes, which are idempotent.
    NotFound(String),
    /// Persistence failure from the SQLite backend.
    Storage(rusqlite::Error),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::Validation(msg) => write!(f, "validation error: {}", msg),
            LedgerError::Conflict(msg) => write!(f, "conflict: {}", msg),
            LedgerError::NotFound(msg) => write!(f, "not found: {}", msg),
            LedgerError::Storage(err) => write!(f, "storage error: {}", err),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Storage(err)
    }
}
