//! Domain classifier: the fixed-priority trust decision chain.
//!
//! Tier order, first match wins:
//!
//! 1. Syntax check (no I/O)
//! 2. Personal-provider set: personal addresses are never acceptable,
//!    regardless of any other signal
//! 3. Disposable set, synchronous snapshot
//! 4. Registry lookup: admin judgments override optimistic defaults
//! 5. External mailbox verification (registry had no entry)
//! 6. Best-effort local fallback: comprehensive disposable check, then
//!    provisionally accept
//!
//! A domain with no registry entry and no static match is provisionally
//! accepted rather than rejected for being unknown; real organizations the
//! admins have never seen must not be turned away by default.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::disposable::DisposableDomainSet;
use crate::personal::PersonalProviderSet;
use crate::registry::{DomainTrustLookup, TrustDecision};
use crate::syntax;
use crate::verifier::MailboxVerifier;
use crate::{
    ClassificationSource, EmailClassification, TrustConfig, STATUS_ACCEPTED, STATUS_DISPOSABLE,
    STATUS_REJECTED,
};

/// Per-tier findings accompanying a registry-aware classification,
/// mirrored into the validation API response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryChecks {
    /// `Some(true)` when the registry explicitly trusts the domain.
    pub explicitly_trusted: Option<bool>,
    /// `Some(true)` when the registry explicitly distrusts the domain.
    pub explicitly_untrusted: Option<bool>,
    pub is_disposable: bool,
    pub is_personal: bool,
    pub exists_in_database: bool,
}

/// Classification plus the tier findings that produced it.
#[derive(Debug, Clone)]
pub struct RegistryClassification {
    pub classification: EmailClassification,
    pub checks: RegistryChecks,
}

/// Anything that can classify an email address; implemented by
/// [`DomainClassifier`] and by test doubles driving the field controller.
#[async_trait]
pub trait Classify: Send + Sync {
    async fn classify(&self, email: &str) -> EmailClassification;
}

/// The decision procedure tying the reference sets, the registry, and the
/// external verifier together.
pub struct DomainClassifier {
    personal: &'static PersonalProviderSet,
    disposable: DisposableDomainSet,
    registry: Arc<dyn DomainTrustLookup>,
    verifier: Arc<dyn MailboxVerifier>,
}

impl DomainClassifier {
    /// Build a classifier with freshly-loaded reference sets.
    pub fn new(
        config: &TrustConfig,
        registry: Arc<dyn DomainTrustLookup>,
        verifier: Arc<dyn MailboxVerifier>,
    ) -> anyhow::Result<Self> {
        Ok(Self::from_parts(
            DisposableDomainSet::new(config)?,
            registry,
            verifier,
        ))
    }

    /// Build a classifier around an existing disposable set (shared with
    /// monitoring surfaces).
    pub fn from_parts(
        disposable: DisposableDomainSet,
        registry: Arc<dyn DomainTrustLookup>,
        verifier: Arc<dyn MailboxVerifier>,
    ) -> Self {
        Self {
            personal: PersonalProviderSet::bundled(),
            disposable,
            registry,
            verifier,
        }
    }

    pub fn disposable_set(&self) -> &DisposableDomainSet {
        &self.disposable
    }

    /// Full classification chain, tiers 1 through 6.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn classify(&self, email: &str) -> EmailClassification {
        let domain = match self.static_screen(email) {
            Ok(domain) => domain,
            Err(classification) => return classification,
        };

        match self.registry_decision(&domain).await {
            TrustDecision::Trusted { reason } => {
                return self.registry_verdict(email, &domain, true, reason);
            }
            TrustDecision::Untrusted { reason } => {
                return self.registry_verdict(email, &domain, false, reason);
            }
            TrustDecision::Unknown => {}
        }

        // Tier 5: the registry has no entry; ask the external provider.
        match self.verifier.verify(email).await {
            Ok(verdict) => {
                debug!(
                    "External verification verdict for {}: status={}",
                    domain, verdict.status
                );
                EmailClassification {
                    email: email.to_string(),
                    domain,
                    is_valid: verdict.is_valid && !verdict.is_disposable,
                    is_disposable: verdict.is_disposable,
                    is_personal: false,
                    status: verdict.status,
                    message: verdict.message,
                    source: ClassificationSource::Fallback,
                }
            }
            Err(unavailable) => {
                debug!(
                    "External verification unavailable for {}: {}",
                    domain, unavailable.reason
                );
                self.local_fallback(email, domain).await
            }
        }
    }

    /// Registry-aware classification, tiers 1 through 4 plus the permissive
    /// default for unknown domains. This is the decision the validation API
    /// serves; no external provider is consulted.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn classify_registry(&self, email: &str) -> RegistryClassification {
        let domain = match self.static_screen(email) {
            Ok(domain) => domain,
            Err(classification) => {
                let checks = RegistryChecks {
                    explicitly_trusted: None,
                    explicitly_untrusted: None,
                    is_disposable: classification.is_disposable,
                    is_personal: classification.is_personal,
                    exists_in_database: false,
                };
                return RegistryClassification {
                    classification,
                    checks,
                };
            }
        };

        let decision = self.registry_decision(&domain).await;
        let checks = RegistryChecks {
            explicitly_trusted: matches!(decision, TrustDecision::Trusted { .. }).then_some(true),
            explicitly_untrusted: matches!(decision, TrustDecision::Untrusted { .. })
                .then_some(true),
            is_disposable: false,
            is_personal: false,
            exists_in_database: decision.exists(),
        };

        let classification = match decision {
            TrustDecision::Trusted { reason } => self.registry_verdict(email, &domain, true, reason),
            TrustDecision::Untrusted { reason } => {
                self.registry_verdict(email, &domain, false, reason)
            }
            TrustDecision::Unknown => EmailClassification {
                email: email.to_string(),
                domain,
                is_valid: true,
                is_disposable: false,
                is_personal: false,
                status: STATUS_ACCEPTED,
                message: "Domain is not known to be untrusted".to_string(),
                source: ClassificationSource::Local,
            },
        };

        RegistryClassification {
            classification,
            checks,
        }
    }

    /// Tiers 1-3: syntax, personal provider, synchronous disposable check.
    /// Returns the lowercased domain when the address survives all three.
    fn static_screen(&self, email: &str) -> Result<String, EmailClassification> {
        let Some(domain) = syntax::domain_of(email) else {
            return Err(EmailClassification {
                email: email.to_string(),
                domain: String::new(),
                is_valid: false,
                is_disposable: false,
                is_personal: false,
                status: STATUS_REJECTED,
                message: "Please enter a valid email address".to_string(),
                source: ClassificationSource::Local,
            });
        };

        if self.personal.contains_domain(&domain) {
            debug!("Personal provider rejected: {}", domain);
            return Err(EmailClassification {
                email: email.to_string(),
                domain,
                is_valid: false,
                is_disposable: false,
                is_personal: true,
                status: STATUS_REJECTED,
                message: "Personal email providers are not accepted for verification".to_string(),
                source: ClassificationSource::Local,
            });
        }

        if self.disposable.is_disposable_sync(email) {
            debug!("Disposable domain rejected: {}", domain);
            return Err(EmailClassification {
                email: email.to_string(),
                domain,
                is_valid: false,
                is_disposable: true,
                is_personal: false,
                status: STATUS_DISPOSABLE,
                message: "Disposable/temporary email addresses are not allowed".to_string(),
                source: ClassificationSource::Local,
            });
        }

        Ok(domain)
    }

    /// Tier 4 lookup. Registry outages are logged and treated as "no
    /// entry" so classification keeps moving down the chain.
    async fn registry_decision(&self, domain: &str) -> TrustDecision {
        match self.registry.lookup(domain).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Registry lookup failed for {}, treating as unknown: {}", domain, e);
                TrustDecision::Unknown
            }
        }
    }

    fn registry_verdict(
        &self,
        email: &str,
        domain: &str,
        is_trusted: bool,
        reason: Option<String>,
    ) -> EmailClassification {
        let message = reason.unwrap_or_else(|| {
            if is_trusted {
                "Trusted organizational domain".to_string()
            } else {
                "Domain is explicitly marked as untrusted".to_string()
            }
        });

        EmailClassification {
            email: email.to_string(),
            domain: domain.to_string(),
            is_valid: is_trusted,
            is_disposable: false,
            is_personal: false,
            status: if is_trusted {
                STATUS_ACCEPTED
            } else {
                STATUS_REJECTED
            },
            message,
            source: ClassificationSource::Api,
        }
    }

    /// Tier 6: the external provider had no opinion. Re-run the
    /// comprehensive disposable check and otherwise accept provisionally.
    async fn local_fallback(&self, email: &str, domain: String) -> EmailClassification {
        if self.disposable.is_disposable(email).await {
            return EmailClassification {
                email: email.to_string(),
                domain,
                is_valid: false,
                is_disposable: true,
                is_personal: false,
                status: STATUS_DISPOSABLE,
                message: "Domain appears to be a disposable/temporary email service (best-effort local check)"
                    .to_string(),
                source: ClassificationSource::Fallback,
            };
        }

        EmailClassification {
            email: email.to_string(),
            domain,
            is_valid: true,
            is_disposable: false,
            is_personal: false,
            status: STATUS_ACCEPTED,
            message: "Accepted by best-effort local check; external verification unavailable"
                .to_string(),
            source: ClassificationSource::Fallback,
        }
    }
}

#[async_trait]
impl Classify for DomainClassifier {
    async fn classify(&self, email: &str) -> EmailClassification {
        DomainClassifier::classify(self, email).await
    }
}
