//! Canonical ledger store.
//!
//! Owns the in-memory [`LedgerState`] behind a `parking_lot::RwLock` plus the
//! SQLite backend. Mutations persist first and only then touch memory, so a
//! storage failure leaves the in-memory state unchanged and reads never
//! observe a partially-applied mutation. Reads hand out snapshot clones.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::Path;
use tracing::{debug, info};

use crate::ledger::error::LedgerError;
use crate::ledger::executor::{plan_round, RoundOutcome};
use crate::models::{
    canonical_key, validate_name, LedgerState, NameConflictPolicy, TieStrategy, UpsertOutcome,
    User,
};
use crate::money::{cents, zero};
use crate::storage::SqliteStore;

/// Users seeded on first run, when no database file exists yet.
fn default_users() -> Vec<(&'static str, Decimal)> {
    vec![("Bob", dec!(4.50)), ("Jim", dec!(3.00)), ("Sara", dec!(5.00))]
}

pub struct LedgerStore {
    state: RwLock<LedgerState>,
    db: SqliteStore,
    conflict_policy: NameConflictPolicy,
    rng: Mutex<ChaCha8Rng>,
}

impl LedgerStore {
    /// Open the ledger at `path`.
    ///
    /// Default users are seeded only when the database file was entirely
    /// absent and `seed_defaults` is set; an explicitly emptied ledger stays
    /// empty across restarts.
    pub fn open<P: AsRef<Path>>(
        path: P,
        conflict_policy: NameConflictPolicy,
        seed_defaults: bool,
        rng_seed: Option<u64>,
    ) -> Result<Self, LedgerError> {
        let (db, fresh) = SqliteStore::open(path)?;
        if fresh && seed_defaults {
            for (name, price) in default_users() {
                db.upsert_user(
                    &canonical_key(name),
                    &User {
                        display_name: name.to_string(),
                        price,
                        balance: zero(),
                    },
                )?;
            }
            info!("Seeded default users into fresh ledger");
        }
        let state = db.load()?;
        debug!(
            users = state.users.len(),
            history = state.history.len(),
            "Loaded ledger state"
        );
        Ok(Self {
            state: RwLock::new(state),
            db,
            conflict_policy,
            rng: Mutex::new(seeded_rng(rng_seed)),
        })
    }

    /// In-memory store for tests: empty ledger, no seeding.
    pub fn in_memory(
        conflict_policy: NameConflictPolicy,
        rng_seed: Option<u64>,
    ) -> Result<Self, LedgerError> {
        let db = SqliteStore::in_memory()?;
        Ok(Self {
            state: RwLock::new(LedgerState::default()),
            db,
            conflict_policy,
            rng: Mutex::new(seeded_rng(rng_seed)),
        })
    }

    /// Read-only snapshot. No side effects, never reseeds.
    pub fn state(&self) -> LedgerState {
        self.state.read().clone()
    }

    /// Idempotently create or update a user's price.
    ///
    /// Case-insensitive name match reuses the existing record under the
    /// canonicalize policy, or fails with a conflict under the reject policy.
    /// New users start with a zero balance.
    pub fn upsert_price(&self, name: &str, price: Decimal) -> Result<UpsertOutcome, LedgerError> {
        let trimmed = validate_name(name)?;
        if price < Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "invalid price {price}: must be >= 0"
            )));
        }
        let price = cents(price);
        let key = canonical_key(trimmed);

        let mut state = self.state.write();
        let (user, outcome) = match state.users.get(&key) {
            Some(existing) => {
                let canonicalized = existing.display_name != trimmed;
                if canonicalized && self.conflict_policy == NameConflictPolicy::Reject {
                    return Err(LedgerError::Conflict(format!(
                        "name {:?} conflicts with existing user {:?}",
                        trimmed, existing.display_name
                    )));
                }
                let user = User {
                    display_name: existing.display_name.clone(),
                    price,
                    balance: existing.balance,
                };
                let outcome = UpsertOutcome {
                    name: user.display_name.clone(),
                    price,
                    created: false,
                    updated: true,
                    canonicalized,
                };
                (user, outcome)
            }
            None => {
                let user = User {
                    display_name: trimmed.to_string(),
                    price,
                    balance: zero(),
                };
                let outcome = UpsertOutcome {
                    name: user.display_name.clone(),
                    price,
                    created: true,
                    updated: false,
                    canonicalized: false,
                };
                (user, outcome)
            }
        };

        self.db.upsert_user(&key, &user)?;
        state.users.insert(key, user);
        Ok(outcome)
    }

    /// Idempotently remove a user. Returns whether a record existed.
    pub fn remove_user(&self, name: &str) -> Result<bool, LedgerError> {
        let key = canonical_key(name);
        let mut state = self.state.write();
        if !state.users.contains_key(&key) {
            return Ok(false);
        }
        self.db.delete_user(&key)?;
        state.users.remove(&key);
        Ok(true)
    }

    /// Zero all balances; optionally empty the history log as well.
    pub fn reset_balances(&self, clear_history: bool) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        self.db.reset_balances(clear_history)?;
        for user in state.users.values_mut() {
            user.balance = zero();
        }
        if clear_history {
            state.history.clear();
        }
        Ok(())
    }

    /// Idempotently empty the history log. Balances are untouched.
    pub fn clear_history(&self) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        self.db.clear_history()?;
        state.history.clear();
        Ok(())
    }

    /// Compute who would pay next without mutating anything.
    pub fn next_payer(
        &self,
        filter: Option<&[String]>,
        tie: TieStrategy,
    ) -> Result<RoundOutcome, LedgerError> {
        let snapshot = self.state.read();
        let mut rng = self.rng.lock();
        plan_round(&snapshot, filter, tie, &mut *rng, Utc::now())
    }

    /// Execute a settlement round: select the payer, adjust balances, append
    /// one history entry. Persists before the in-memory state changes.
    pub fn run_round(
        &self,
        filter: Option<&[String]>,
        tie: TieStrategy,
    ) -> Result<(RoundOutcome, LedgerState), LedgerError> {
        let mut state = self.state.write();
        let outcome = {
            let mut rng = self.rng.lock();
            plan_round(&state, filter, tie, &mut *rng, Utc::now())?
        };
        self.db.apply_round(&outcome)?;
        outcome.apply_to(&mut state);
        info!(
            payer = %outcome.entry.payer,
            amount = %outcome.entry.amount,
            participants = outcome.entry.participants.len(),
            "Executed settlement round"
        );
        Ok((outcome, state.clone()))
    }
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}
