//! Round execution.
//!
//! Plans a settlement round against a [`LedgerState`] snapshot without
//! mutating it: the store applies the resulting [`RoundOutcome`] to memory
//! and persistence atomically. Keeping planning pure makes the zero-sum
//! invariant directly testable and lets `GET /api/next` reuse the same code
//! path without side effects.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::ledger::error::LedgerError;
use crate::ledger::selector::{resolve_candidates, select_next};
use crate::models::{HistoryEntry, LedgerState, TieStrategy};
use crate::money::cents;

/// Planned effect of one settlement round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    /// Canonical key of the selected payer.
    pub payer_key: String,
    /// Audit log entry for the round (display names, total group cost).
    pub entry: HistoryEntry,
    /// Post-round balances for every participant, keyed canonically.
    pub new_balances: BTreeMap<String, Decimal>,
}

impl RoundOutcome {
    /// Apply the planned round to a state: adjust balances and append the
    /// history entry.
    pub fn apply_to(&self, state: &mut LedgerState) {
        for (key, balance) in &self.new_balances {
            if let Some(user) = state.users.get_mut(key) {
                user.balance = *balance;
            }
        }
        state.history.push(self.entry.clone());
    }
}

/// Plan a settlement round.
///
/// Participants are the resolved candidate set; the charged amount is the sum
/// of their prices. Redistribution: each non-payer's balance increases by
/// their own price, the payer's balance decreases by the sum of the other
/// participants' prices, so the balance sum is unchanged.
pub fn plan_round<R: Rng>(
    state: &LedgerState,
    filter: Option<&[String]>,
    tie: TieStrategy,
    rng: &mut R,
    timestamp: DateTime<Utc>,
) -> Result<RoundOutcome, LedgerError> {
    let candidates = resolve_candidates(state, filter)?;
    let payer_key = select_next(state, &candidates, tie, rng)?;

    let amount: Decimal = candidates
        .iter()
        .filter_map(|k| state.users.get(k).map(|u| u.price))
        .sum();
    let amount = cents(amount);

    let mut new_balances = BTreeMap::new();
    let mut participants = Vec::with_capacity(candidates.len());
    for key in &candidates {
        let user = state
            .users
            .get(key)
            .ok_or_else(|| LedgerError::NotFound(format!("participant {key}")))?;
        participants.push(user.display_name.clone());
        let balance = if *key == payer_key {
            user.balance - (amount - user.price)
        } else {
            user.balance + user.price
        };
        new_balances.insert(key.clone(), cents(balance));
    }

    let payer = state
        .users
        .get(&payer_key)
        .map(|u| u.display_name.clone())
        .ok_or_else(|| LedgerError::NotFound(format!("participant {payer_key}")))?;

    Ok(RoundOutcome {
        payer_key,
        entry: HistoryEntry {
            timestamp,
            payer,
            amount,
            participants,
        },
        new_balances,
    })
}
