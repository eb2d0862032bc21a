//! # trust_core
//!
//! Email trust-classification engine for volunteer-hour verification.
//! Decides whether a supplied verification email belongs to a legitimate
//! organization, a consumer webmail provider, or a disposable mailbox.
//!
//! ## Features
//!
//! - **Fixed-priority classification chain**: syntax, personal-provider,
//!   disposable, admin registry, external verification, local fallback
//! - **Reference sets** loaded once from bundled data assets, with a
//!   best-effort remote refresh for the disposable list
//! - **Registry seam** so an admin-curated allow/deny list always overrides
//!   static heuristics
//! - **Debounced field controller** for driving the classifier from
//!   interactive input without redundant or stale work
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use trust_core::registry::MemoryRegistry;
//! use trust_core::verifier::NullVerifier;
//! use trust_core::{DomainClassifier, TrustConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TrustConfig::default();
//!     let classifier = DomainClassifier::new(
//!         &config,
//!         Arc::new(MemoryRegistry::new()),
//!         Arc::new(NullVerifier),
//!     )?;
//!
//!     let result = classifier.classify("coordinator@foodbank.org").await;
//!     println!("acceptable: {}", result.is_valid);
//!
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod disposable;
pub mod field;
pub mod personal;
pub mod registry;
pub mod syntax;
pub mod verifier;

use serde::{Deserialize, Serialize};

/// Configuration for the classification engine.
#[derive(Debug, Clone)]
pub struct TrustConfig {
    /// Remote disposable-domain blocklist URL (plain text, one domain per
    /// line). `None` disables the remote refresh entirely.
    pub blocklist_url: Option<String>,
    /// Timeout for a single remote blocklist fetch, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Age after which a warm disposable cache is refreshed, in seconds.
    pub refresh_interval_secs: u64,
    /// Debounce delay for the verification field controller, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            blocklist_url: Some(
                "https://raw.githubusercontent.com/disposable-email-domains/disposable-email-domains/main/disposable_email_blocklist.conf"
                    .to_string(),
            ),
            fetch_timeout_ms: 10_000,
            refresh_interval_secs: 86_400, // 24 hours
            debounce_ms: 500,
        }
    }
}

/// Classification accepted the address.
pub const STATUS_ACCEPTED: u16 = 200;
/// Rejected: bad syntax, personal provider, or explicitly untrusted domain.
pub const STATUS_REJECTED: u16 = 400;
/// Rejected: disposable/temporary mailbox.
pub const STATUS_DISPOSABLE: u16 = 401;

/// Which tier of the classification chain produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    /// Static reference sets and syntax checks, no I/O.
    Local,
    /// Registry-backed decision.
    Api,
    /// External verification or the best-effort local fallback.
    Fallback,
}

/// The verdict for a single candidate email address.
///
/// `is_valid` is false whenever `is_disposable` or `is_personal` is true,
/// and exactly one `source` is attributed per classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailClassification {
    /// The candidate address as submitted.
    pub email: String,
    /// Lowercased domain part, empty when the address has no parsable domain.
    pub domain: String,
    /// True only if the address is acceptable as an organizational
    /// verification source.
    pub is_valid: bool,
    pub is_disposable: bool,
    pub is_personal: bool,
    /// HTTP-style status code (200 acceptable, 400/401 rejected).
    pub status: u16,
    /// Human-readable explanation, safe to surface to end users.
    pub message: String,
    pub source: ClassificationSource,
}

// Re-export main types
pub use classifier::DomainClassifier;
pub use disposable::DisposableDomainSet;
pub use field::VerificationField;
pub use personal::PersonalProviderSet;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrustConfig::default();
        assert!(config.blocklist_url.is_some());
        assert_eq!(config.fetch_timeout_ms, 10_000);
        assert_eq!(config.refresh_interval_secs, 86_400);
        assert_eq!(config.debounce_ms, 500);
    }

    #[test]
    fn test_source_serialization() {
        assert_eq!(
            serde_json::to_string(&ClassificationSource::Local).unwrap(),
            "\"local\""
        );
        assert_eq!(
            serde_json::to_string(&ClassificationSource::Api).unwrap(),
            "\"api\""
        );
        assert_eq!(
            serde_json::to_string(&ClassificationSource::Fallback).unwrap(),
            "\"fallback\""
        );
    }

    #[test]
    fn test_classification_serializes_camel_case() {
        let classification = EmailClassification {
            email: "x@example.org".to_string(),
            domain: "example.org".to_string(),
            is_valid: true,
            is_disposable: false,
            is_personal: false,
            status: STATUS_ACCEPTED,
            message: "ok".to_string(),
            source: ClassificationSource::Local,
        };
        let json = serde_json::to_string(&classification).unwrap();
        assert!(json.contains("\"isValid\":true"));
        assert!(json.contains("\"isDisposable\":false"));
        assert!(json.contains("\"isPersonal\":false"));
    }
}
