//! JWT authentication for the admin domain-registry surface.
//!
//! All `/domains` mutations and listings require a token whose claims carry
//! the admin role: requests without a valid token get 401, authenticated
//! non-admins get 403, and neither response leaks registry contents.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Signing keys, derived once from `JWT_SECRET`.
static KEYS: LazyLock<Keys> = LazyLock::new(|| {
    let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    Keys {
        encoding: EncodingKey::from_secret(secret.as_bytes()),
        decoding: DecodingKey::from_secret(secret.as_bytes()),
    }
});

/// Role claim granting access to the domain registry.
pub const ROLE_ADMIN: &str = "admin";

/// Token lifetime in seconds.
const TOKEN_TTL_SECS: usize = 3600;

/// Claims carried in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to
    pub sub: String,
    /// Issuing service
    pub iss: String,
    /// Role resolved at login time
    pub role: String,
    /// Expiry, seconds since the epoch
    pub exp: usize,
    /// Issued-at, seconds since the epoch
    pub iat: usize,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct AuthPayload {
    pub username: String,
    pub password: String,
}

/// Issued-token response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: usize,
}

/// Authentication and authorization failures
#[derive(Debug)]
pub enum AuthError {
    WrongCredentials,
    MissingCredentials,
    TokenCreation,
    InvalidToken,
    ExpiredToken,
    NotAdmin,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Claims {
    /// Claims for a freshly-authenticated user with the given role.
    pub fn new(username: String, role: String) -> Self {
        let now = chrono::Utc::now().timestamp() as usize;

        Self {
            sub: username,
            iss: "domain-trust-api".to_string(),
            role,
            exp: now + TOKEN_TTL_SECS,
            iat: now,
        }
    }

    /// Sign these claims into a bearer token.
    pub fn to_token(&self) -> Result<String, AuthError> {
        encode(&Header::default(), self, &KEYS.encoding).map_err(|e| {
            warn!("Token signing failed: {}", e);
            AuthError::TokenCreation
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl AuthResponse {
    pub fn new(token: String) -> Self {
        Self {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: TOKEN_TTL_SECS,
        }
    }
}

/// Bearer-token extractor: pulls claims out of the Authorization header.
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or_else(|| {
                debug!("Request carried no usable Authorization header");
                AuthError::InvalidToken
            })?;

        let token_data =
            decode::<Claims>(token, &KEYS.decoding, &Validation::default()).map_err(|e| {
                warn!("Token rejected: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                    _ => AuthError::InvalidToken,
                }
            })?;

        debug!("Accepted token for user: {}", token_data.claims.sub);
        Ok(token_data.claims)
    }
}

/// Claims that have passed the admin-role check. The registry handlers take
/// this extractor, so a non-admin request is rejected before any query runs.
#[derive(Debug, Clone)]
pub struct AdminClaims(pub Claims);

impl<S> FromRequestParts<S> for AdminClaims
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            warn!("Non-admin user '{}' denied registry access", claims.sub);
            return Err(AuthError::NotAdmin);
        }
        Ok(AdminClaims(claims))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code) = match self {
            AuthError::WrongCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password",
                "INVALID_CREDENTIALS",
            ),
            AuthError::MissingCredentials => (
                StatusCode::BAD_REQUEST,
                "Username and password are required",
                "MISSING_CREDENTIALS",
            ),
            AuthError::TokenCreation => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create authentication token",
                "TOKEN_CREATION_ERROR",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Invalid or malformed authentication token",
                "INVALID_TOKEN",
            ),
            AuthError::ExpiredToken => (
                StatusCode::UNAUTHORIZED,
                "Authentication token has expired",
                "EXPIRED_TOKEN",
            ),
            AuthError::NotAdmin => (
                StatusCode::FORBIDDEN,
                "Admin access required",
                "ADMIN_REQUIRED",
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "error_code": error_code,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

/// Check the login pair against the environment-configured admin account.
pub fn validate_credentials(username: &str, password: &str) -> Result<(), AuthError> {
    let expected_username = std::env::var("ADMIN_API_USERNAME").map_err(|_| {
        warn!("ADMIN_API_USERNAME environment variable not set");
        AuthError::MissingCredentials
    })?;

    let expected_password = std::env::var("ADMIN_API_PASSWORD").map_err(|_| {
        warn!("ADMIN_API_PASSWORD environment variable not set");
        AuthError::MissingCredentials
    })?;

    if username != expected_username || password != expected_password {
        warn!("Rejected login attempt for username: {}", username);
        return Err(AuthError::WrongCredentials);
    }

    Ok(())
}

/// Issue a token for a valid login.
pub async fn authenticate(Json(payload): Json<AuthPayload>) -> Result<Json<AuthResponse>, AuthError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    validate_credentials(&payload.username, &payload.password)?;

    // The only credential pair configured is the admin account.
    let claims = Claims::new(payload.username.clone(), ROLE_ADMIN.to_string());
    let token = claims.to_token()?;

    debug!("Issued admin token for user: {}", payload.username);

    Ok(Json(AuthResponse::new(token)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new("admin".to_string(), ROLE_ADMIN.to_string());
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.iss, "domain-trust-api");
        assert!(claims.is_admin());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_non_admin_role() {
        let claims = Claims::new("student".to_string(), "student".to_string());
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_auth_response_creation() {
        let response = AuthResponse::new("test_token".to_string());
        assert_eq!(response.access_token, "test_token");
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 3600);
    }

    #[test]
    fn test_not_admin_maps_to_forbidden() {
        let response = AuthError::NotAdmin.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_expired_token_maps_to_unauthorized() {
        let response = AuthError::ExpiredToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
