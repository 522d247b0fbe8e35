//! Reporting handlers

use axum::{extract::{Query, State}, Json};

use crate::AppState;
use crate::engine::{AccessStats, StatsWindow};
use crate::middleware::auth::AdminContext;

/// Aggregate ledger stats, optionally bounded by `since` / `until`
pub async fn summary(
    State(state): State<AppState>,
    _admin: AdminContext,
    Query(window): Query<StatsWindow>,
) -> Json<AccessStats> {
    Json(state.engine.get_stats(Some(window)))
}
