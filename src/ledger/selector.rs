//! Next-payer selection.
//!
//! Pure functions over a [`LedgerState`] snapshot: no side effects, callable
//! concurrently. The candidate with the lowest current balance pays next;
//! ties are resolved by the requested [`TieStrategy`]. Randomness comes from
//! an injected RNG so tests stay deterministic.

use rand::Rng;

use crate::ledger::error::LedgerError;
use crate::models::{canonical_key, LedgerState, TieStrategy};

/// Resolve an optional participant filter to an ordered list of canonical
/// keys.
///
/// - `None` or an empty list means "all registered users".
/// - A non-empty filter must name only registered users; duplicates under
///   case-insensitive comparison are dropped, preserving first occurrence.
/// - An empty resulting set is a validation error.
pub fn resolve_candidates(
    state: &LedgerState,
    filter: Option<&[String]>,
) -> Result<Vec<String>, LedgerError> {
    let candidates = match filter {
        Some(names) if !names.is_empty() => {
            let mut seen = Vec::with_capacity(names.len());
            for name in names {
                let key = canonical_key(name);
                if !state.users.contains_key(&key) {
                    return Err(LedgerError::Validation(format!(
                        "unknown participant: {}",
                        name.trim()
                    )));
                }
                if !seen.contains(&key) {
                    seen.push(key);
                }
            }
            seen
        }
        _ => state.users.keys().cloned().collect(),
    };

    if candidates.is_empty() {
        return Err(LedgerError::Validation(
            "no participants available for this round".to_string(),
        ));
    }
    Ok(candidates)
}

/// Pick the next payer among `candidates` (canonical keys, assumed resolved
/// via [`resolve_candidates`]). Returns the payer's canonical key.
pub fn select_next<R: Rng>(
    state: &LedgerState,
    candidates: &[String],
    tie: TieStrategy,
    rng: &mut R,
) -> Result<String, LedgerError> {
    let lowest = candidates
        .iter()
        .filter_map(|k| state.users.get(k).map(|u| u.balance))
        .min()
        .ok_or_else(|| {
            LedgerError::Validation("no participants available for this round".to_string())
        })?;

    let mut tied: Vec<String> = candidates
        .iter()
        .filter(|k| state.users.get(k.as_str()).map(|u| u.balance) == Some(lowest))
        .cloned()
        .collect();
    tied.sort();

    if tied.len() == 1 {
        return Ok(tied.remove(0));
    }

    let winner = match tie {
        TieStrategy::Name => tied.remove(0),
        TieStrategy::Random => tied.remove(rng.gen_range(0..tied.len())),
        TieStrategy::Oldest => {
            // Position of each candidate's most recent payment in the
            // append-only log; never-paid candidates rank first.
            let last_paid = |key: &str| -> Option<usize> {
                state
                    .history
                    .iter()
                    .rposition(|entry| canonical_key(&entry.payer) == key)
            };
            tied.sort_by_key(|key| (last_paid(key).map_or(0, |idx| idx + 1), key.clone()));
            tied.remove(0)
        }
    };
    Ok(winner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryEntry, User};
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn user(display: &str, price: Decimal, balance: Decimal) -> (String, User) {
        (
            canonical_key(display),
            User {
                display_name: display.to_string(),
                price,
                balance,
            },
        )
    }

    fn state_with(users: Vec<(String, User)>) -> LedgerState {
        LedgerState {
            users: users.into_iter().collect(),
            history: Vec::new(),
        }
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn test_lowest_balance_wins_outright() {
        let state = state_with(vec![
            user("Alice", dec!(3.00), dec!(5.00)),
            user("Bob", dec!(4.00), dec!(-2.00)),
        ]);
        let candidates = resolve_candidates(&state, None).unwrap();
        let payer = select_next(&state, &candidates, TieStrategy::Name, &mut rng()).unwrap();
        assert_eq!(payer, "bob");
    }

    #[test]
    fn test_name_tie_break_is_lexicographic() {
        let state = state_with(vec![
            user("alice", dec!(3.00), dec!(0.00)),
            user("bob", dec!(4.00), dec!(0.00)),
        ]);
        let candidates = resolve_candidates(&state, None).unwrap();
        let payer = select_next(&state, &candidates, TieStrategy::Name, &mut rng()).unwrap();
        assert_eq!(payer, "alice");
    }

    #[test]
    fn test_random_tie_break_is_reproducible_with_seed() {
        let state = state_with(vec![
            user("Alice", dec!(3.00), dec!(0.00)),
            user("Bob", dec!(4.00), dec!(0.00)),
            user("Cora", dec!(5.00), dec!(0.00)),
        ]);
        let candidates = resolve_candidates(&state, None).unwrap();
        let first =
            select_next(&state, &candidates, TieStrategy::Random, &mut rng()).unwrap();
        let second =
            select_next(&state, &candidates, TieStrategy::Random, &mut rng()).unwrap();
        assert_eq!(first, second);
        assert!(candidates.contains(&first));
    }

    #[test]
    fn test_oldest_prefers_never_paid_then_least_recent() {
        let mut state = state_with(vec![
            user("Alice", dec!(3.00), dec!(0.00)),
            user("Bob", dec!(4.00), dec!(0.00)),
            user("Cora", dec!(5.00), dec!(0.00)),
        ]);
        state.history = vec![
            HistoryEntry {
                timestamp: Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap(),
                payer: "Alice".to_string(),
                amount: dec!(12.00),
                participants: vec!["Alice".into(), "Bob".into(), "Cora".into()],
            },
            HistoryEntry {
                timestamp: Utc.with_ymd_and_hms(2025, 8, 2, 12, 0, 0).unwrap(),
                payer: "Bob".to_string(),
                amount: dec!(12.00),
                participants: vec!["Alice".into(), "Bob".into(), "Cora".into()],
            },
        ];

        let candidates = resolve_candidates(&state, None).unwrap();
        // Cora never paid, so she goes first.
        let payer = select_next(&state, &candidates, TieStrategy::Oldest, &mut rng()).unwrap();
        assert_eq!(payer, "cora");

        // Restricted to the two that have paid: Alice paid longer ago.
        let filter = vec!["Alice".to_string(), "Bob".to_string()];
        let candidates = resolve_candidates(&state, Some(&filter)).unwrap();
        let payer = select_next(&state, &candidates, TieStrategy::Oldest, &mut rng()).unwrap();
        assert_eq!(payer, "alice");
    }

    #[test]
    fn test_filter_must_name_known_users() {
        let state = state_with(vec![user("Alice", dec!(3.00), dec!(0.00))]);
        let filter = vec!["Alice".to_string(), "Zed".to_string()];
        let err = resolve_candidates(&state, Some(&filter)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_filter_dedupes_case_insensitively() {
        let state = state_with(vec![user("Alice", dec!(3.00), dec!(0.00))]);
        let filter = vec!["Alice".to_string(), "ALICE".to_string()];
        let candidates = resolve_candidates(&state, Some(&filter)).unwrap();
        assert_eq!(candidates, vec!["alice".to_string()]);
    }

    #[test]
    fn test_empty_ledger_is_a_validation_error() {
        let state = LedgerState::default();
        assert!(matches!(
            resolve_candidates(&state, None),
            Err(LedgerError::Validation(_))
        ));
    }
}
