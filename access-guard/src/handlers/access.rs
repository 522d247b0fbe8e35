//! Access ledger handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use validator::Validate;

use crate::{AppError, AppResult, AppState};
use crate::engine::{AccessRecord, SuspicionFinding};
use crate::middleware::auth::AdminContext;
use crate::models::{
    AccessRecordRow, AdmissionQuery, AdmissionResponse, RecordAccessRequest, SuspicionQuery,
};

/// Ingest one access event
pub async fn record(
    State(state): State<AppState>,
    Json(req): Json<RecordAccessRequest>,
) -> AppResult<Json<AccessRecord>> {
    req.validate()?;

    let record = state.engine.record_access(req.into())?;

    // memory is authoritative; a failed write-through is logged, not surfaced
    if let Some(pool) = &state.pool {
        if let Err(e) = AccessRecordRow::upsert(pool, &record).await {
            tracing::error!("Failed to persist access record {}: {}", record.address, e);
        }
    }

    Ok(Json(record))
}

/// Admission check for the gating layer
pub async fn check(
    State(state): State<AppState>,
    Query(query): Query<AdmissionQuery>,
) -> Json<AdmissionResponse> {
    let admitted = state.engine.is_admitted(&query.address);

    Json(AdmissionResponse {
        address: query.address,
        admitted,
    })
}

/// List tracked addresses, most recently active first
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Json<Vec<AccessRecord>> {
    Json(state.engine.list_records())
}

/// Get one address's history
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(address): Path<String>,
) -> AppResult<Json<AccessRecord>> {
    state.engine
        .get_record(&address)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No access record for {}", address)))
}

/// Evaluate suspicion for one address
pub async fn suspicion(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(address): Path<String>,
    Query(query): Query<SuspicionQuery>,
) -> AppResult<Json<SuspicionFinding>> {
    let params = query.apply(state.engine.suspicion_defaults())?;
    Ok(Json(state.engine.evaluate_suspicion(&address, Some(params))))
}
