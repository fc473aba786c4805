//! Ledger state machine: store, next-payer selection, and round execution.

pub mod error;
pub mod executor;
pub mod selector;
pub mod store;

pub use error::LedgerError;
pub use executor::{plan_round, RoundOutcome};
pub use selector::select_next;
pub use store::LedgerStore;
