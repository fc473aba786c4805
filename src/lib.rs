//! Splitround Backend Library
//!
//! Bill-splitting ledger service: per-person prices and balances, next-payer
//! selection, settlement rounds, and an append-only history log behind a
//! REST API.
//!
//! Exposes core modules for use by the server binary and tests.

pub mod api;
pub mod config;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod money;
pub mod storage;

pub use config::Config;
pub use ledger::store::LedgerStore;
