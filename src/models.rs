//! Core domain types for the bill-splitting ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ledger::error::LedgerError;

/// Maximum accepted length for a participant name.
pub const MAX_NAME_LEN: usize = 40;

/// A registered participant.
///
/// Keyed in [`LedgerState::users`] by canonical (trimmed, lowercased) name;
/// `display_name` preserves the casing of first registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub display_name: String,
    pub price: Decimal,
    pub balance: Decimal,
}

/// One settled round. Append-only: never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    /// Display name of the participant who paid.
    pub payer: String,
    /// Total group cost of the round.
    pub amount: Decimal,
    /// Display names of everyone charged in the round.
    pub participants: Vec<String>,
}

/// Full ledger snapshot: the single source of truth for Selector and Executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Canonical key -> user record.
    pub users: BTreeMap<String, User>,
    /// Ordered, append-only audit log of all executed rounds.
    pub history: Vec<HistoryEntry>,
}

impl LedgerState {
    /// Sum of all balances. Invariant: unchanged by round execution.
    pub fn balance_sum(&self) -> Decimal {
        self.users.values().map(|u| u.balance).sum()
    }
}

/// Case-normalized identifier used for uniqueness checks and lookups.
pub fn canonical_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Validate a participant name: 1-40 chars, letters, spaces, hyphen,
/// apostrophe. Returns the trimmed name.
pub fn validate_name(name: &str) -> Result<&str, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
        return Err(LedgerError::Validation(format!(
            "invalid name {trimmed:?}: must be 1-{MAX_NAME_LEN} characters"
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphabetic() || matches!(c, ' ' | '-' | '\''))
    {
        return Err(LedgerError::Validation(format!(
            "invalid name {trimmed:?}: letters, spaces, hyphen and apostrophe only"
        )));
    }
    Ok(trimmed)
}

/// Tie-break strategy for equally-eligible next payers. Crosses the wire as
/// a plain string via [`TieStrategy::parse`] and [`TieStrategy::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieStrategy {
    /// Lexicographic ascending on canonical key.
    Name,
    /// Uniform pick among tied candidates (seeded RNG).
    Random,
    /// Least recently recorded as payer; never-paid candidates first.
    #[default]
    Oldest,
}

impl TieStrategy {
    /// Parse a client-supplied strategy string. `None` or empty falls back to
    /// the default; unknown values are rejected.
    pub fn parse(value: Option<&str>) -> Result<Self, LedgerError> {
        let Some(raw) = value else {
            return Ok(Self::default());
        };
        match raw.trim().to_lowercase().as_str() {
            "" => Ok(Self::default()),
            "name" => Ok(Self::Name),
            "random" => Ok(Self::Random),
            "oldest" => Ok(Self::Oldest),
            other => Err(LedgerError::Validation(format!(
                "unknown tie strategy {other:?}: expected one of name, random, oldest"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Random => "random",
            Self::Oldest => "oldest",
        }
    }
}

/// Policy for a price upsert whose name matches an existing record with
/// different casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameConflictPolicy {
    /// Reuse the existing record, keeping its display casing.
    #[default]
    Canonicalize,
    /// Reject the request with a conflict error.
    Reject,
}

/// Outcome of an idempotent price upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertOutcome {
    /// Stored display name after the operation.
    pub name: String,
    pub price: Decimal,
    pub created: bool,
    pub updated: bool,
    /// True when the request named an existing record with different casing.
    pub canonicalized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_key_normalizes_case_and_whitespace() {
        assert_eq!(canonical_key("  Bob "), "bob");
        assert_eq!(canonical_key("Sara O'Connor"), "sara o'connor");
    }

    #[test]
    fn test_validate_name_accepts_letters_spaces_punctuation() {
        assert_eq!(validate_name("Sara O'Connor").unwrap(), "Sara O'Connor");
        assert_eq!(validate_name(" Anne-Marie ").unwrap(), "Anne-Marie");
    }

    #[test]
    fn test_validate_name_rejects_digits_and_empty() {
        assert!(validate_name("Bob123").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(41)).is_err());
    }

    #[test]
    fn test_tie_strategy_parse() {
        assert_eq!(TieStrategy::parse(None).unwrap(), TieStrategy::Oldest);
        assert_eq!(TieStrategy::parse(Some(" Name ")).unwrap(), TieStrategy::Name);
        assert_eq!(TieStrategy::parse(Some("random")).unwrap(), TieStrategy::Random);
        assert!(TieStrategy::parse(Some("round_robin")).is_err());
    }
}
