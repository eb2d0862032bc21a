//! Registry-aware email validation endpoint.
//!
//! Serves the verification field in the hours-logging form. The decision is
//! the classifier's registry-aware chain (syntax, personal, disposable,
//! registry); the server copy is authoritative and a client-reported
//! verdict is never trusted.

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use trust_core::classifier::RegistryChecks;
use trust_core::ClassificationSource;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Request body for POST /validate-email-domain
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub email: Option<String>,
}

/// Validation verdict returned to the form.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub email: String,
    pub domain: String,
    pub is_valid: bool,
    pub status: u16,
    pub reason: String,
    pub source: ClassificationSource,
    pub checks: RegistryChecks,
}

/// POST /validate-email-domain
#[instrument(skip(state, body))]
pub async fn validate_domain_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ValidateRequest>,
) -> ApiResult<ValidateResponse> {
    let Some(email) = body.email.filter(|e| !e.trim().is_empty()) else {
        return Err(ApiError::Validation(
            "Missing required field: email".to_string(),
        ));
    };

    let result = state.classifier.classify_registry(&email).await;
    let classification = result.classification;

    debug!(
        "Domain validation verdict for {}: valid={} status={}",
        classification.domain, classification.is_valid, classification.status
    );

    Ok(Json(ValidateResponse {
        email: classification.email,
        domain: classification.domain,
        is_valid: classification.is_valid,
        status: classification.status,
        reason: classification.message,
        source: classification.source,
        checks: result.checks,
    }))
}
