//! Integration tests for ledger persistence across restarts.
//!
//! These verify the seeding and durability rules end to end: defaults appear
//! only when the database file is absent, explicit deletions survive a
//! restart, and executed rounds are reloaded intact.

use rust_decimal_macros::dec;
use splitround_backend::models::{NameConflictPolicy, TieStrategy};
use splitround_backend::LedgerStore;

fn open(path: &std::path::Path, seed: bool) -> LedgerStore {
    LedgerStore::open(path, NameConflictPolicy::Canonicalize, seed, Some(42)).unwrap()
}

#[test]
fn test_defaults_seeded_only_on_first_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");

    let store = open(&path, true);
    let state = store.state();
    assert_eq!(state.users.len(), 3);
    assert_eq!(state.users["bob"].price, dec!(4.50));
    assert_eq!(state.users["jim"].price, dec!(3.00));
    assert_eq!(state.users["sara"].price, dec!(5.00));
    assert!(state.users.values().all(|u| u.balance == dec!(0.00)));
    drop(store);

    // Remove everyone, restart: the emptied ledger must stay empty.
    let store = open(&path, true);
    for name in ["Bob", "Jim", "Sara"] {
        store.remove_user(name).unwrap();
    }
    drop(store);

    let store = open(&path, true);
    assert!(store.state().users.is_empty());
}

#[test]
fn test_rounds_and_balances_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");

    let store = open(&path, false);
    store.upsert_price("Bob", dec!(4.50)).unwrap();
    store.upsert_price("Jim", dec!(3.00)).unwrap();
    let (outcome, state) = store.run_round(None, TieStrategy::Name).unwrap();
    assert_eq!(state.balance_sum(), dec!(0.00));
    drop(store);

    let store = open(&path, false);
    let reloaded = store.state();
    assert_eq!(reloaded.history.len(), 1);
    assert_eq!(reloaded.history[0], outcome.entry);
    assert_eq!(reloaded.users["bob"].balance, outcome.new_balances["bob"]);
    assert_eq!(reloaded.users["jim"].balance, outcome.new_balances["jim"]);
    assert_eq!(reloaded.balance_sum(), dec!(0.00));
}

#[test]
fn test_clear_history_persists_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");

    let store = open(&path, false);
    store.upsert_price("Bob", dec!(4.50)).unwrap();
    store.run_round(None, TieStrategy::Name).unwrap();
    store.clear_history().unwrap();
    drop(store);

    let store = open(&path, false);
    let state = store.state();
    assert!(state.history.is_empty());
    assert_eq!(state.users.len(), 1);
}

#[test]
fn test_display_casing_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");

    let store = open(&path, false);
    store.upsert_price("Sara O'Connor", dec!(5.00)).unwrap();
    store.upsert_price("SARA O'CONNOR", dec!(6.00)).unwrap();
    drop(store);

    let store = open(&path, false);
    let state = store.state();
    assert_eq!(state.users.len(), 1);
    assert_eq!(state.users["sara o'connor"].display_name, "Sara O'Connor");
    assert_eq!(state.users["sara o'connor"].price, dec!(6.00));
}
