//! REST API surface.
//!
//! Controllers stay thin: validation and delegation to the [`LedgerStore`],
//! transport concerns here, money logic in the ledger module.
//!
//! Routing table:
//!
//! | Method & path               | Success | Notes                         |
//! |-----------------------------|---------|-------------------------------|
//! | GET    /health              | 200     | liveness + version            |
//! | GET    /api/state           | 200     | read-only snapshot            |
//! | GET    /api/next            | 200     | `people` repeatable, `tie`    |
//! | POST   /api/run             | 200     | executes a settlement round   |
//! | PUT    /api/users/:name/price | 200/201 | idempotent upsert           |
//! | DELETE /api/users/:name     | 204     | idempotent                    |
//! | PUT    /api/balances        | 200     | zero balances, opt. history   |
//! | DELETE /api/history         | 204     | idempotent                    |

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ledger::error::LedgerError;
use crate::ledger::store::LedgerStore;
use crate::models::{HistoryEntry, LedgerState, TieStrategy, UpsertOutcome};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LedgerStore>,
}

/// Create the API router
pub fn create_router(store: Arc<LedgerStore>) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/state", get(get_state))
        .route("/api/next", get(get_next))
        .route("/api/run", post(post_run))
        .route("/api/users/:name/price", put(put_user_price))
        .route("/api/users/:name", delete(delete_user))
        .route("/api/balances", put(put_balances))
        .route("/api/history", delete(delete_history))
        .with_state(state)
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Read-only ledger snapshot: prices, balances, and full history.
async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    Json(StateResponse::from_state(&state.store.state()))
}

/// Who pays next, without mutating anything.
///
/// Query parameters: `people` (repeatable) restricts the candidate set;
/// `tie` selects the tie-break strategy (`name`, `random`, `oldest`).
async fn get_next(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<NextResponse>, ApiError> {
    let (people, tie_raw) = split_query(params);
    let tie = TieStrategy::parse(tie_raw.as_deref())?;
    let outcome = state.store.next_payer(people_filter(&people), tie)?;

    Ok(Json(NextResponse {
        payer: outcome.entry.payer,
        amount: outcome.entry.amount,
        participants: outcome.entry.participants,
        tie: tie.as_str(),
    }))
}

/// Execute a settlement round. Not idempotent: retries charge again.
async fn post_run(
    State(state): State<AppState>,
    Json(body): Json<RunRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    let tie = TieStrategy::parse(body.tie.as_deref())?;
    let people = body.people.unwrap_or_default();
    let (outcome, updated) = state.store.run_round(people_filter(&people), tie)?;

    Ok(Json(RunResponse {
        timestamp: outcome.entry.timestamp,
        payer: outcome.entry.payer,
        amount: outcome.entry.amount,
        participants: outcome.entry.participants,
        tie: tie.as_str(),
        state: StateResponse::from_state(&updated),
    }))
}

/// Idempotent price upsert. 201 when the user was created, 200 otherwise.
async fn put_user_price(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<PriceBody>,
) -> Result<Response, ApiError> {
    let outcome = state.store.upsert_price(&name, body.price)?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let snapshot = state.store.state();

    Ok((
        status,
        Json(UpsertResponse {
            ok: true,
            outcome,
            state: StateResponse::from_state(&snapshot),
        }),
    )
        .into_response())
}

/// Idempotent user removal: 204 whether or not the user existed.
async fn delete_user(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.remove_user(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reset all balances to zero; optionally clear history too.
async fn put_balances(
    State(state): State<AppState>,
    body: Option<Json<ResetBalancesBody>>,
) -> Result<Json<ResetResponse>, ApiError> {
    let clear_history = body
        .map(|Json(b)| b.clear_history.unwrap_or(false))
        .unwrap_or(false);
    state.store.reset_balances(clear_history)?;

    Ok(Json(ResetResponse {
        ok: true,
        state: StateResponse::from_state(&state.store.state()),
    }))
}

/// Idempotently empty the history log. Balances are untouched.
async fn delete_history(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store.clear_history()?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Request/Response Types =====

fn split_query(params: Vec<(String, String)>) -> (Vec<String>, Option<String>) {
    let mut people = Vec::new();
    let mut tie = None;
    for (key, value) in params {
        match key.as_str() {
            "people" => people.push(value),
            "tie" => tie = Some(value),
            _ => {}
        }
    }
    (people, tie)
}

/// Empty filter means "all registered users".
fn people_filter(people: &[String]) -> Option<&[String]> {
    if people.is_empty() {
        None
    } else {
        Some(people)
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct StateResponse {
    prices: BTreeMap<String, Decimal>,
    balances: BTreeMap<String, Decimal>,
    history: Vec<HistoryEntry>,
}

impl StateResponse {
    fn from_state(state: &LedgerState) -> Self {
        let mut prices = BTreeMap::new();
        let mut balances = BTreeMap::new();
        for user in state.users.values() {
            prices.insert(user.display_name.clone(), user.price);
            balances.insert(user.display_name.clone(), user.balance);
        }
        Self {
            prices,
            balances,
            history: state.history.clone(),
        }
    }
}

#[derive(Serialize)]
struct NextResponse {
    payer: String,
    amount: Decimal,
    participants: Vec<String>,
    tie: &'static str,
}

#[derive(Deserialize)]
struct RunRequest {
    people: Option<Vec<String>>,
    tie: Option<String>,
}

#[derive(Serialize)]
struct RunResponse {
    timestamp: DateTime<Utc>,
    payer: String,
    amount: Decimal,
    participants: Vec<String>,
    tie: &'static str,
    #[serde(flatten)]
    state: StateResponse,
}

#[derive(Deserialize)]
struct PriceBody {
    price: Decimal,
}

#[derive(Serialize)]
struct UpsertResponse {
    ok: bool,
    #[serde(flatten)]
    outcome: UpsertOutcome,
    #[serde(flatten)]
    state: StateResponse,
}

#[derive(Deserialize, Default)]
struct ResetBalancesBody {
    clear_history: Option<bool>,
}

#[derive(Serialize)]
struct ResetResponse {
    ok: bool,
    #[serde(flatten)]
    state: StateResponse,
}

// ===== Error Handling =====

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Conflict(String),
    NotFound(String),
    Internal(LedgerError),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(msg) => ApiError::BadRequest(msg),
            LedgerError::Conflict(msg) => ApiError::Conflict(msg),
            LedgerError::NotFound(msg) => ApiError::NotFound(msg),
            LedgerError::Storage(_) => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(err) => {
                tracing::error!("Storage error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
