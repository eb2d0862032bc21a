//! Admin domain-registry CRUD handlers.
//!
//! All four handlers require an admin token via the [`AdminClaims`]
//! extractor; a missing or non-admin session is rejected before any query
//! touches the registry.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use trust_core::registry::TrustedDomain;
use trust_core::syntax;

use crate::auth::AdminClaims;
use crate::db::{DomainPatch, ListParams};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query parameters for GET /domains
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
}

/// Paged listing response
#[derive(Debug, Serialize)]
pub struct DomainsResponse {
    pub domains: Vec<TrustedDomain>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

/// Envelope for create/update/delete responses
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub success: bool,
    pub domain: TrustedDomain,
}

/// Request body for POST /domains
#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    pub domain: Option<String>,
    pub is_trusted: Option<bool>,
    pub reason: Option<String>,
}

/// Request body for PUT /domains
#[derive(Debug, Deserialize)]
pub struct UpdateDomainRequest {
    #[serde(rename = "domainId")]
    pub domain_id: Uuid,
    pub updates: UpdateBody,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    pub domain: Option<String>,
    pub is_trusted: Option<bool>,
    pub reason: Option<String>,
}

/// Request body for DELETE /domains
#[derive(Debug, Deserialize)]
pub struct DeleteDomainRequest {
    #[serde(rename = "domainId")]
    pub domain_id: Uuid,
}

/// Largest allowed page size; bounds the scan an admin can request.
const MAX_PAGE_SIZE: u32 = 100;

/// GET /domains?page&limit&search&status
#[instrument(skip(state, admin), fields(admin = %admin.0.sub))]
pub async fn list_domains_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminClaims,
    Query(query): Query<ListQuery>,
) -> ApiResult<DomainsResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, MAX_PAGE_SIZE);
    let trusted = parse_status_filter(query.status.as_deref())?;

    let params = ListParams {
        page,
        limit,
        search: query.search.filter(|s| !s.trim().is_empty()),
        trusted,
    };

    let result = state.store.list(&params).await.map_err(ApiError::from)?;

    Ok(Json(DomainsResponse {
        pagination: Pagination {
            page,
            limit,
            total: result.total,
            total_pages: total_pages(result.total, limit),
        },
        domains: result.domains,
    }))
}

/// POST /domains
#[instrument(skip(state, admin, body), fields(admin = %admin.0.sub))]
pub async fn create_domain_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminClaims,
    Json(body): Json<CreateDomainRequest>,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    let (Some(domain), Some(is_trusted)) = (body.domain, body.is_trusted) else {
        return Err(ApiError::Validation(
            "Missing required fields: domain and is_trusted".to_string(),
        ));
    };

    let normalized = domain.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ApiError::Validation("Invalid domain".to_string()));
    }
    if !syntax::is_valid_domain_format(&normalized) {
        return Err(ApiError::Validation(format!(
            "Invalid domain format: {normalized}"
        )));
    }

    let record = state
        .store
        .insert(
            &normalized,
            is_trusted,
            body.reason.as_deref().filter(|r| !r.trim().is_empty()),
            &admin.0.sub,
        )
        .await
        .map_err(ApiError::from)?;

    info!(
        "Domain '{}' added as {} by {}",
        record.domain,
        if record.is_trusted { "trusted" } else { "untrusted" },
        admin.0.sub
    );

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            success: true,
            domain: record,
        }),
    ))
}

/// PUT /domains
#[instrument(skip(state, admin, body), fields(admin = %admin.0.sub))]
pub async fn update_domain_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminClaims,
    Json(body): Json<UpdateDomainRequest>,
) -> ApiResult<MutationResponse> {
    // Re-judging a domain must not silently rename it.
    if body.updates.domain.is_some() {
        return Err(ApiError::Validation(
            "Domain cannot be changed; delete the entry and add a new one".to_string(),
        ));
    }

    let patch = DomainPatch {
        is_trusted: body.updates.is_trusted,
        reason: body.updates.reason,
    };
    if patch.is_empty() {
        return Err(ApiError::Validation(
            "Missing fields to update: is_trusted or reason".to_string(),
        ));
    }

    let record = state
        .store
        .update(body.domain_id, &patch)
        .await
        .map_err(ApiError::from)?;

    info!("Domain '{}' re-judged by {}", record.domain, admin.0.sub);

    Ok(Json(MutationResponse {
        success: true,
        domain: record,
    }))
}

/// DELETE /domains
#[instrument(skip(state, admin), fields(admin = %admin.0.sub))]
pub async fn delete_domain_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminClaims,
    Json(body): Json<DeleteDomainRequest>,
) -> ApiResult<MutationResponse> {
    let record = state
        .store
        .delete(body.domain_id)
        .await
        .map_err(ApiError::from)?;

    info!(
        "Domain '{}' judgment removed by {}; domain reverts to unknown",
        record.domain, admin.0.sub
    );

    Ok(Json(MutationResponse {
        success: true,
        domain: record,
    }))
}

fn parse_status_filter(status: Option<&str>) -> Result<Option<bool>, ApiError> {
    match status {
        None | Some("") => Ok(None),
        Some("trusted") => Ok(Some(true)),
        Some("untrusted") => Ok(Some(false)),
        Some(other) => Err(ApiError::Validation(format!(
            "status must be 'trusted' or 'untrusted', got '{other}'"
        ))),
    }
}

fn total_pages(total: i64, limit: u32) -> i64 {
    let limit = i64::from(limit);
    (total + limit - 1) / limit
}
