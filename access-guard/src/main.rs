//! Access Guard Server
//!
//! IP admission and access-anomaly service behind the sorting-facility
//! monitoring dashboard.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ACCESS GUARD                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  Ingest / │  │  Admin    │  │  AccessPolicyEngine     │ │
//! │  │  Check    │  │  API      │  │  ledger · whitelist ·   │ │
//! │  │  (Axum)   │  │  (JWT)    │  │  suspicion · stats      │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │              ┌──────────────────┐                          │
//! │              │ PostgreSQL (opt.)│                          │
//! │              └──────────────────┘                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod engine;
mod models;
mod handlers;
mod middleware;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post, delete},
    middleware as axum_middleware,
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use engine::AccessPolicyEngine;
pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "access_guard=debug,tower_http=debug".into()));
    if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Access Guard starting ({})...", config.environment);
    if config.is_production() && config.jwt_secret.starts_with("access-guard-dev-secret") {
        tracing::warn!("JWT_SECRET is the development default");
    }

    let engine = Arc::new(AccessPolicyEngine::new(config.history_capacity, config.suspicion));

    // Optional persistence
    let pool = match &config.database_url {
        Some(url) => {
            tracing::info!("Database: {}", url.split('@').last().unwrap_or("***"));
            let pool = db::create_pool(url).await
                .context("Failed to create database pool")?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await
                .context("Failed to run migrations")?;

            let (records, entries) = db::load_snapshot(&pool).await
                .context("Failed to load persisted access state")?;
            engine.restore(records, entries);
            Some(pool)
        }
        None => {
            tracing::info!("No DATABASE_URL set, running in-memory");
            None
        }
    };

    // Build application state
    let state = AppState {
        engine,
        pool,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AccessPolicyEngine>,
    pub pool: Option<sqlx::PgPool>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Ingest and admission check (internal network, called by the gating layer)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/access/events", post(handlers::access::record))
        .route("/api/v1/access/check", get(handlers::access::check));

    // Admin routes (JWT with admin role)
    let admin_routes = Router::new()
        // Ledger
        .route("/api/v1/access/records", get(handlers::access::list))
        .route("/api/v1/access/records/:address", get(handlers::access::get))
        .route("/api/v1/access/records/:address/suspicion", get(handlers::access::suspicion))

        // Whitelist
        .route("/api/v1/whitelist", get(handlers::whitelist::list))
        .route("/api/v1/whitelist", post(handlers::whitelist::admit))
        .route("/api/v1/whitelist/:id", delete(handlers::whitelist::revoke))

        // Reports
        .route("/api/v1/stats", get(handlers::stats::summary))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin_auth
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::State;
    use axum::http::{header, Method, Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::middleware::auth::Claims;

    fn test_state() -> AppState {
        let config = config::Config::for_tests();
        AppState {
            engine: Arc::new(AccessPolicyEngine::new(config.history_capacity, config.suspicion)),
            pool: None,
            config,
        }
    }

    fn token(role: &str) -> String {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "admin-1".to_string(),
            role: role.to_string(),
            exp: now + 3600,
            iat: now,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
    }

    async fn send(app: &Router, method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(role) = auth {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(role)));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn access_event(address: &str, location: &str, ts: &str) -> Value {
        json!({
            "address": address,
            "user_id": "operator-7",
            "device": "control-panel",
            "location": location,
            "timestamp": ts,
        })
    }

    #[test]
    fn test_health_reports_memory_mode() {
        let response = tokio_test::block_on(handlers::health::check(State(test_state())));
        let body = serde_json::to_value(&response.0).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["persistence"], "memory");
    }

    #[tokio::test]
    async fn test_record_then_check_is_denied() {
        let app = create_router(test_state());

        let (status, body) = send(&app, Method::POST, "/api/v1/access/events", None,
            Some(access_event("192.168.1.20", "Line 1", "2024-05-01T08:00:00Z"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["access_count"], 1);

        let (status, body) = send(&app, Method::GET, "/api/v1/access/check?address=192.168.1.20", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["admitted"], false);
    }

    #[tokio::test]
    async fn test_record_invalid_address() {
        let app = create_router(test_state());
        let (status, _) = send(&app, Method::POST, "/api/v1/access/events", None,
            Some(access_event("bogus", "Line 1", "2024-05-01T08:00:00Z"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin_token() {
        let app = create_router(test_state());

        let (status, _) = send(&app, Method::GET, "/api/v1/whitelist", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::GET, "/api/v1/whitelist", Some("viewer"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::GET, "/api/v1/whitelist", Some("admin"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_whitelist_lifecycle() {
        let app = create_router(test_state());

        let (status, entry) = send(&app, Method::POST, "/api/v1/whitelist", Some("admin"),
            Some(json!({ "address_or_cidr": "10.0.0.0/24", "admitted_by": "admin-1" }))).await;
        assert_eq!(status, StatusCode::OK);
        let id = entry["id"].as_str().unwrap().to_string();

        let (_, body) = send(&app, Method::GET, "/api/v1/access/check?address=10.0.0.5", None, None).await;
        assert_eq!(body["admitted"], true);
        let (_, body) = send(&app, Method::GET, "/api/v1/access/check?address=10.0.1.5", None, None).await;
        assert_eq!(body["admitted"], false);

        let (status, _) = send(&app, Method::POST, "/api/v1/whitelist", Some("admin"),
            Some(json!({ "address_or_cidr": "10.0.0.0/24", "admitted_by": "admin-1" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, Method::POST, "/api/v1/whitelist", Some("admin"),
            Some(json!({ "address_or_cidr": "not-an-ip", "admitted_by": "admin-1" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/v1/whitelist/{}", id);
        let (_, body) = send(&app, Method::DELETE, &uri, Some("admin"), None).await;
        assert_eq!(body["removed"], true);
        assert_eq!(body["id"], id.as_str());
        let (_, body) = send(&app, Method::DELETE, &uri, Some("admin"), None).await;
        assert_eq!(body["removed"], false);

        let (_, body) = send(&app, Method::GET, "/api/v1/access/check?address=10.0.0.5", None, None).await;
        assert_eq!(body["admitted"], false);
    }

    #[tokio::test]
    async fn test_suspicion_and_stats() {
        let app = create_router(test_state());
        let events = [
            ("Sorting Hall", "2024-05-01T08:00:00Z"),
            ("Loading Dock", "2024-05-01T08:00:05Z"),
            ("Office", "2024-05-01T08:00:10Z"),
            ("Warehouse", "2024-05-01T08:00:20Z"),
            ("Office", "2024-05-01T08:00:30Z"),
        ];
        for (location, ts) in events {
            send(&app, Method::POST, "/api/v1/access/events", None,
                Some(access_event("172.16.5.5", location, ts))).await;
        }

        let (status, finding) = send(&app, Method::GET, "/api/v1/access/records/172.16.5.5/suspicion",
            Some("admin"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(finding["suspicious"], true);
        assert_eq!(finding["reasons"][0], "Multiple locations (4) from same IP");
        assert_eq!(finding["reasons"][1], "Rapid access attempts within short time frame");

        let (_, finding) = send(&app, Method::GET,
            "/api/v1/access/records/172.16.5.5/suspicion?location_threshold=10&window_seconds=10",
            Some("admin"), None).await;
        assert_eq!(finding["suspicious"], false);

        let (status, body) = send(&app, Method::GET,
            "/api/v1/access/records/172.16.5.5/suspicion?rapid_count=6",
            Some("admin"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);

        let (_, stats) = send(&app, Method::GET, "/api/v1/stats", Some("admin"), None).await;
        assert_eq!(stats["total_accesses"], 5);
        assert_eq!(stats["unique_addresses"], 1);
        assert_eq!(stats["top_locations"][0]["label"], "Office");

        let (_, stats) = send(&app, Method::GET, "/api/v1/stats?since=2024-06-01T00:00:00Z",
            Some("admin"), None).await;
        assert_eq!(stats["total_accesses"], 0);
    }

    #[tokio::test]
    async fn test_revoke_malformed_id_is_noop() {
        let app = create_router(test_state());
        send(&app, Method::POST, "/api/v1/whitelist", Some("admin"),
            Some(json!({ "address_or_cidr": "10.3.3.3", "admitted_by": "admin-1" }))).await;

        let (status, body) = send(&app, Method::DELETE, "/api/v1/whitelist/not-a-uuid", Some("admin"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], false);
        assert_eq!(body["id"], "not-a-uuid");

        let (_, body) = send(&app, Method::GET, "/api/v1/access/check?address=10.3.3.3", None, None).await;
        assert_eq!(body["admitted"], true);
    }

    #[tokio::test]
    async fn test_ipv6_spellings_share_a_record() {
        let app = create_router(test_state());
        for (address, ts) in [("::1", "2024-05-01T08:00:00Z"), ("0:0:0:0:0:0:0:1", "2024-05-01T08:00:05Z")] {
            let (status, _) = send(&app, Method::POST, "/api/v1/access/events", None,
                Some(access_event(address, "Lab", ts))).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, records) = send(&app, Method::GET, "/api/v1/access/records", Some("admin"), None).await;
        assert_eq!(records.as_array().map(Vec::len), Some(1));
        assert_eq!(records[0]["access_count"], 2);
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let app = create_router(test_state());
        let (status, _) = send(&app, Method::GET, "/api/v1/access/records/10.9.9.9", Some("admin"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
