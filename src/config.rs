//! Application configuration.
//!
//! Environment variable overrides are supported via `.env` (loaded at
//! startup), allowing deployment-specific settings without modifying source.

use crate::models::NameConflictPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite ledger database.
    pub db_path: String,
    pub host: String,
    pub port: u16,
    /// Policy for price upserts whose name matches an existing record with
    /// different casing.
    pub conflict_policy: NameConflictPolicy,
    /// Seed default users when the database file is absent (first run).
    pub seed_defaults: bool,
    /// Fixed RNG seed for the random tie-break. Unset means entropy-seeded.
    pub rng_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let db_path =
            std::env::var("LEDGER_DB_PATH").unwrap_or_else(|_| "./ledger.db".to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let conflict_policy = match std::env::var("LEDGER_NAME_CONFLICT")
            .unwrap_or_else(|_| "canonicalize".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "reject" => NameConflictPolicy::Reject,
            _ => NameConflictPolicy::Canonicalize,
        };

        let seed_defaults = std::env::var("LEDGER_SEED_DEFAULTS")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(true);

        let rng_seed = std::env::var("LEDGER_RNG_SEED")
            .ok()
            .and_then(|v| v.parse::<u64>().ok());

        Ok(Self {
            db_path,
            host,
            port,
            conflict_policy,
            seed_defaults,
            rng_seed,
        })
    }
}
