//! Health check and monitoring routes
//!
//! This module contains endpoints for service health checks, readiness
//! probes, and monitoring metrics.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use trust_core::disposable::CacheState;
use trust_core::PersonalProviderSet;

use crate::auth::AdminClaims;
use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: std::time::SystemTime,
}

/// Health check endpoint - GET /health
///
/// Simple health check to verify the API is running.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: std::time::SystemTime::now(),
    })
}

/// Readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: bool,
    pub disposable_cache: &'static str,
    pub timestamp: std::time::SystemTime,
}

/// Readiness check endpoint - GET /ready
///
/// Verifies the registry database is reachable. Classification itself
/// degrades gracefully without the database, but the admin surface does not.
pub async fn ready_handler(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let database = match sqlx::query("SELECT 1").execute(state.store.pool()).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            false
        }
    };

    Json(ReadinessResponse {
        ready: database,
        database,
        disposable_cache: state.disposable.state().as_str(),
        timestamp: std::time::SystemTime::now(),
    })
}

/// Metrics endpoint - GET /metrics
///
/// Returns Prometheus-compatible metrics for monitoring.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> (StatusCode, String) {
    let metrics = format!(
        "# HELP volunteer_trust_disposable_domains_total Disposable domains in the current snapshot\n\
         # TYPE volunteer_trust_disposable_domains_total gauge\n\
         volunteer_trust_disposable_domains_total {}\n\
         \n\
         # HELP volunteer_trust_personal_providers_total Personal-provider domains in the static set\n\
         # TYPE volunteer_trust_personal_providers_total gauge\n\
         volunteer_trust_personal_providers_total {}\n\
         \n\
         # HELP volunteer_trust_disposable_cache_state Disposable cache state (0=cold, 1=loading, 2=warm)\n\
         # TYPE volunteer_trust_disposable_cache_state gauge\n\
         volunteer_trust_disposable_cache_state {}\n\
         \n\
         # HELP volunteer_trust_build_info Build information\n\
         # TYPE volunteer_trust_build_info gauge\n\
         volunteer_trust_build_info{{version=\"{}\"}} 1\n",
        state.disposable.domain_count(),
        PersonalProviderSet::bundled().len(),
        cache_state_gauge(state.disposable.state()),
        env!("CARGO_PKG_VERSION")
    );

    (StatusCode::OK, metrics)
}

/// Statistics response
#[derive(Serialize)]
pub struct StatsResponse {
    pub version: String,
    pub disposable_domains: usize,
    pub personal_providers: usize,
    pub disposable_cache_state: &'static str,
    pub remote_blocklist_loaded: bool,
    pub timestamp: std::time::SystemTime,
}

/// Statistics endpoint - GET /admin/stats
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        disposable_domains: state.disposable.domain_count(),
        personal_providers: PersonalProviderSet::bundled().len(),
        disposable_cache_state: state.disposable.state().as_str(),
        remote_blocklist_loaded: state.disposable.remote_loaded(),
        timestamp: std::time::SystemTime::now(),
    })
}

/// Cache response
#[derive(Serialize)]
pub struct CacheResponse {
    pub message: String,
    pub disposable_domains: usize,
    pub timestamp: std::time::SystemTime,
}

/// Cache refresh endpoint - POST /admin/cache/refresh
///
/// Forces a disposable-blocklist refresh ahead of the normal interval.
pub async fn refresh_cache_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminClaims,
) -> Json<CacheResponse> {
    state.disposable.force_refresh().await;

    info!("Disposable blocklist refresh forced by {}", admin.0.sub);

    Json(CacheResponse {
        message: "Disposable blocklist refreshed".to_string(),
        disposable_domains: state.disposable.domain_count(),
        timestamp: std::time::SystemTime::now(),
    })
}

fn cache_state_gauge(state: CacheState) -> u8 {
    match state {
        CacheState::Cold => 0,
        CacheState::Loading => 1,
        CacheState::Warm => 2,
    }
}
