//! External mailbox-verification fallback adapter.
//!
//! Consulted only when the registry has no opinion about a domain. The
//! provider call is bounded by a timeout and never retried: a single miss
//! is acceptable because the field controller re-invokes classification on
//! the next settled input anyway. Every failure mode (timeout, non-2xx,
//! malformed body) collapses into [`VerificationUnavailable`], which the
//! classifier treats as "no opinion", never as "invalid".

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// A definitive verdict from the verification provider.
#[derive(Debug, Clone)]
pub struct MailboxVerdict {
    pub is_valid: bool,
    pub is_disposable: bool,
    /// Provider status code (200 valid, 400 invalid, 401 disposable,
    /// 402 invalid domain, 403 invalid format).
    pub status: u16,
    pub message: String,
}

/// The provider could not produce a verdict.
#[derive(Debug, Error)]
#[error("verification unavailable: {reason}")]
pub struct VerificationUnavailable {
    pub reason: String,
}

impl VerificationUnavailable {
    fn because(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Seam between the classifier and the third-party verification service.
#[async_trait]
pub trait MailboxVerifier: Send + Sync {
    async fn verify(&self, email: &str) -> Result<MailboxVerdict, VerificationUnavailable>;
}

/// Verifier for deployments without a provider key: always "no opinion",
/// which demotes classification to the local fallback tier.
pub struct NullVerifier;

#[async_trait]
impl MailboxVerifier for NullVerifier {
    async fn verify(&self, _email: &str) -> Result<MailboxVerdict, VerificationUnavailable> {
        Err(VerificationUnavailable::because(
            "no verification provider configured",
        ))
    }
}

/// Adapter for an EmailListVerify-style HTTP verification API.
pub struct ListVerifyClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

// The API key is server-side configuration; keep it out of log output.
impl std::fmt::Debug for ListVerifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListVerifyClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    email: &'a str,
    key: &'a str,
    format: &'static str,
}

/// Provider responses vary between `status`/`code` and `message`/`msg`
/// field names; accept both.
#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

impl ListVerifyClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for mailbox verification")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl MailboxVerifier for ListVerifyClient {
    async fn verify(&self, email: &str) -> Result<MailboxVerdict, VerificationUnavailable> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&VerifyRequest {
                email,
                key: &self.api_key,
                format: "json",
            })
            .send()
            .await
            .map_err(|e| {
                warn!("Mailbox verification request failed: {}", e);
                VerificationUnavailable::because(e.to_string())
            })?;

        if !response.status().is_success() {
            warn!(
                "Mailbox verification returned HTTP {}",
                response.status()
            );
            return Err(VerificationUnavailable::because(format!(
                "provider returned HTTP {}",
                response.status()
            )));
        }

        let body: VerifyResponse = response.json().await.map_err(|e| {
            warn!("Mailbox verification body unparsable: {}", e);
            VerificationUnavailable::because("malformed provider response")
        })?;

        let Some(status) = body.status.or(body.code) else {
            warn!("Mailbox verification response missing status");
            return Err(VerificationUnavailable::because(
                "provider response missing status",
            ));
        };

        let message = body
            .message
            .or(body.msg)
            .unwrap_or_else(|| provider_status_message(status).to_string());

        debug!("Mailbox verification verdict: status={}", status);

        Ok(MailboxVerdict {
            is_valid: status == 200,
            is_disposable: status == 401,
            status,
            message,
        })
    }
}

/// Fallback messages for verdicts whose body carries no message.
fn provider_status_message(status: u16) -> &'static str {
    match status {
        200 => "Valid email address",
        400 => "Invalid email address",
        401 => "Disposable email address not allowed",
        402 => "Invalid domain",
        403 => "Invalid email format",
        _ => "Unknown verification status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ListVerifyClient {
        ListVerifyClient::new(server.uri(), "test-key", Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "email": "staff@example.org",
                "key": "test-key",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 200,
                "message": "ok"
            })))
            .mount(&server)
            .await;

        let verdict = client(&server).verify("staff@example.org").await.unwrap();
        assert!(verdict.is_valid);
        assert!(!verdict.is_disposable);
        assert_eq!(verdict.status, 200);
        assert_eq!(verdict.message, "ok");
    }

    #[tokio::test]
    async fn test_disposable_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 401
            })))
            .mount(&server)
            .await;

        let verdict = client(&server).verify("x@burner.example").await.unwrap();
        assert!(!verdict.is_valid);
        assert!(verdict.is_disposable);
        assert_eq!(verdict.status, 401);
        assert_eq!(verdict.message, "Disposable email address not allowed");
    }

    #[tokio::test]
    async fn test_non_2xx_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).verify("x@example.org").await.unwrap_err();
        assert!(err.reason.contains("503"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).verify("x@example.org").await.unwrap_err();
        assert_eq!(err.reason, "malformed provider response");
    }

    #[tokio::test]
    async fn test_missing_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "shrug"
            })))
            .mount(&server)
            .await;

        let err = client(&server).verify("x@example.org").await.unwrap_err();
        assert_eq!(err.reason, "provider response missing status");
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": 200}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client =
            ListVerifyClient::new(server.uri(), "test-key", Duration::from_millis(50)).unwrap();
        assert!(client.verify("x@example.org").await.is_err());
    }

    #[tokio::test]
    async fn test_null_verifier_has_no_opinion() {
        assert!(NullVerifier.verify("x@example.org").await.is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = ListVerifyClient::new(
            "https://verify.example",
            "super-secret",
            Duration::from_secs(1),
        )
        .unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }
}
