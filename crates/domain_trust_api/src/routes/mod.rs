//! API Routes Module
//!
//! This module organizes all HTTP endpoints into logical groups:
//! - `auth`: Authentication endpoint for obtaining admin JWT tokens
//! - `domains`: Admin CRUD over the trusted-domain registry
//! - `validate`: Registry-aware email validation for the hours form
//! - `health`: Health checks and monitoring endpoints

pub mod auth;
pub mod domains;
pub mod health;
pub mod validate;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Assemble every endpoint onto one router sharing the application state.
pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Authentication
        .route("/auth/login", post(auth::login_handler))
        // Admin domain registry
        .route(
            "/domains",
            get(domains::list_domains_handler)
                .post(domains::create_domain_handler)
                .put(domains::update_domain_handler)
                .delete(domains::delete_domain_handler),
        )
        // Public validation endpoint consumed by the verification field
        .route("/validate-email-domain", post(validate::validate_domain_handler))
        // Health and monitoring
        .route("/health", get(health::health_handler))
        .route("/ready", get(health::ready_handler))
        .route("/metrics", get(health::metrics_handler))
        // Administrative endpoints
        .route("/admin/stats", get(health::stats_handler))
        .route("/admin/cache/refresh", post(health::refresh_cache_handler))
        // Apply shared state to all routes
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::config::AppConfig;
    use crate::db::DomainStore;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;
    use trust_core::registry::MemoryRegistry;
    use trust_core::verifier::NullVerifier;
    use trust_core::{DisposableDomainSet, DomainClassifier, TrustConfig};

    /// Router over an in-memory registry and a lazily-connected (never
    /// dialed) pool: everything except the sqlx-backed CRUD is exercisable.
    fn test_router() -> Router {
        std::env::set_var("JWT_SECRET", "route-test-secret");

        let trust_config = TrustConfig {
            blocklist_url: None,
            ..TrustConfig::default()
        };
        let disposable = DisposableDomainSet::new(&trust_config).unwrap();

        let registry = Arc::new(MemoryRegistry::new());
        registry
            .insert("example.org", true, Some("district partner"), "admin-1")
            .unwrap();
        registry
            .insert("spammy.test", false, Some("known abuse"), "admin-1")
            .unwrap();

        let classifier = DomainClassifier::from_parts(
            disposable.clone(),
            registry,
            Arc::new(NullVerifier),
        );

        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/never_dialed")
            .unwrap();

        build_routes(Arc::new(AppState {
            classifier: Arc::new(classifier),
            disposable,
            store: DomainStore::new(pool),
            config: Arc::new(AppConfig::default()),
        }))
    }

    fn validate_request(email: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/validate-email-domain")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!("{{\"email\":\"{email}\"}}")))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_validate_trusted_domain() {
        let response = test_router()
            .oneshot(validate_request("staff@example.org"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["isValid"], true);
        assert_eq!(body["status"], 200);
        assert_eq!(body["source"], "api");
        assert_eq!(body["reason"], "district partner");
        assert_eq!(body["checks"]["existsInDatabase"], true);
    }

    #[tokio::test]
    async fn test_validate_personal_email() {
        let response = test_router()
            .oneshot(validate_request("student@gmail.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["isValid"], false);
        assert_eq!(body["status"], 400);
        assert_eq!(body["source"], "local");
        assert_eq!(body["checks"]["isPersonal"], true);
    }

    #[tokio::test]
    async fn test_validate_untrusted_domain() {
        let response = test_router()
            .oneshot(validate_request("x@spammy.test"))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["isValid"], false);
        assert_eq!(body["status"], 400);
        assert_eq!(body["source"], "api");
        assert_eq!(body["reason"], "known abuse");
    }

    #[tokio::test]
    async fn test_validate_missing_email() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/validate-email-domain")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_domains_require_authentication() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/domains")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_domains_reject_non_admin() {
        std::env::set_var("JWT_SECRET", "route-test-secret");
        let token = Claims::new("student".to_string(), "student".to_string())
            .to_token()
            .unwrap();

        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/domains")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_domains_reject_garbage_token() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/domains")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
