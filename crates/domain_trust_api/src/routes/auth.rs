//! Authentication endpoint for obtaining admin JWT tokens.

use axum::Json;

use crate::auth::{self, AuthError, AuthPayload, AuthResponse};

/// POST /auth/login
///
/// Issues a short-lived admin token for the credential pair configured in
/// the server environment. Every `/domains` route requires the resulting
/// bearer token.
pub async fn login_handler(payload: Json<AuthPayload>) -> Result<Json<AuthResponse>, AuthError> {
    auth::authenticate(payload).await
}
