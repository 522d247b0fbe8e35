//! Whitelist management handlers

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use std::future::Future;
use uuid::Uuid;
use validator::Validate;

use crate::{AppResult, AppState};
use crate::engine::{AccessPolicyEngine, WhitelistEntry};
use crate::middleware::auth::AdminContext;
use crate::models::{AdmitRequest, RevokeResponse, WhitelistEntryRow};

/// List whitelist entries in admission order
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Json<Vec<WhitelistEntry>> {
    Json(state.engine.list_whitelist())
}

/// Admit an address or CIDR block
pub async fn admit(
    State(state): State<AppState>,
    admin: AdminContext,
    Json(req): Json<AdmitRequest>,
) -> AppResult<Json<WhitelistEntry>> {
    req.validate()?;

    let entry = state.engine.admit(&req.address_or_cidr, &req.admitted_by, Utc::now())?;

    if let Some(pool) = &state.pool {
        if let Err(e) = WhitelistEntryRow::insert(pool, &entry).await {
            // keep memory and storage in agreement
            state.engine.revoke(entry.id);
            return Err(e.into());
        }
    }

    tracing::info!(
        "Whitelist entry {} created by {} ({})",
        entry.id, admin.user_id, admin.role
    );

    Ok(Json(entry))
}

/// Revoke a whitelist entry. Unknown or malformed ids are a no-op.
pub async fn revoke(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(raw_id): Path<String>,
) -> AppResult<Json<RevokeResponse>> {
    let Ok(entry_id) = Uuid::parse_str(raw_id.trim()) else {
        tracing::debug!("Revoke with malformed whitelist id {:?}", raw_id);
        return Ok(Json(RevokeResponse { id: raw_id, removed: false }));
    };

    let removed = match &state.pool {
        Some(pool) => {
            revoke_persisted(&state.engine, entry_id, |id| WhitelistEntryRow::delete(pool, id)).await?
        }
        None => state.engine.revoke(entry_id),
    };

    if removed {
        tracing::info!("Whitelist entry {} revoked by {}", entry_id, admin.user_id);
    }

    Ok(Json(RevokeResponse {
        id: entry_id.to_string(),
        removed,
    }))
}

/// Delete from storage first, then from memory. A failed delete leaves the
/// entry admitted in both places so the revoke can be retried.
pub(crate) async fn revoke_persisted<F, Fut, E>(
    engine: &AccessPolicyEngine,
    entry_id: Uuid,
    delete: F,
) -> Result<bool, E>
where
    F: FnOnce(Uuid) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let stored = delete(entry_id).await?;
    let in_memory = engine.revoke(entry_id);
    Ok(stored || in_memory)
}

// ============================================================================
// TESTS
// ============================================================================
