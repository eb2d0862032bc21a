//! Trust registry types and the lookup seam.
//!
//! The registry is the admin-curated allow/deny list that overrides every
//! static heuristic. The durable store lives behind [`DomainTrustLookup`]
//! so the classifier works the same against Postgres, an in-memory map, or
//! anything else an embedder provides.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A single admin judgment about a domain.
///
/// `domain` is stored lowercased and trimmed, and is unique across the
/// registry. A domain absent from the registry is "unknown" (neither
/// trusted nor untrusted) and falls through to the other classification
/// tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedDomain {
    pub id: Uuid,
    pub domain: String,
    pub is_trusted: bool,
    pub reason: Option<String>,
    /// Identifier of the admin who created the entry.
    pub added_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a registry lookup for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    Trusted { reason: Option<String> },
    Untrusted { reason: Option<String> },
    Unknown,
}

impl TrustDecision {
    /// Whether the registry holds an explicit judgment for the domain.
    pub fn exists(&self) -> bool {
        !matches!(self, TrustDecision::Unknown)
    }
}

/// The registry could not be queried. The classifier treats this as
/// "no opinion" and degrades to the next tier.
#[derive(Debug, Error)]
#[error("trust registry unavailable: {0}")]
pub struct RegistryUnavailable(pub String);

/// Read seam between the classifier and the durable registry store.
#[async_trait]
pub trait DomainTrustLookup: Send + Sync {
    /// Exact-match lookup; `domain` is expected to be lowercased already.
    async fn lookup(&self, domain: &str) -> Result<TrustDecision, RegistryUnavailable>;
}

/// Duplicate-domain error from [`MemoryRegistry::insert`], mirroring the
/// unique-constraint contract of the durable store.
#[derive(Debug, Error)]
#[error("domain already exists: {0}")]
pub struct DomainConflict(pub String);

/// In-memory registry for tests and embedders without a database.
#[derive(Default)]
pub struct MemoryRegistry {
    entries: RwLock<HashMap<String, TrustedDomain>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a judgment, normalizing the domain. Fails on duplicates, like
    /// the unique index on the durable store.
    pub fn insert(
        &self,
        domain: &str,
        is_trusted: bool,
        reason: Option<&str>,
        added_by: &str,
    ) -> Result<TrustedDomain, DomainConflict> {
        let normalized = domain.trim().to_lowercase();
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if entries.contains_key(&normalized) {
            return Err(DomainConflict(normalized));
        }

        let now = Utc::now();
        let record = TrustedDomain {
            id: Uuid::new_v4(),
            domain: normalized.clone(),
            is_trusted,
            reason: reason.map(str::to_string),
            added_by: added_by.to_string(),
            created_at: now,
            updated_at: now,
        };
        entries.insert(normalized, record.clone());
        Ok(record)
    }

    /// Remove a judgment, reverting the domain to "unknown".
    pub fn remove(&self, domain: &str) -> Option<TrustedDomain> {
        let normalized = domain.trim().to_lowercase();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&normalized)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DomainTrustLookup for MemoryRegistry {
    async fn lookup(&self, domain: &str) -> Result<TrustDecision, RegistryUnavailable> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(match entries.get(&domain.to_lowercase()) {
            Some(entry) if entry.is_trusted => TrustDecision::Trusted {
                reason: entry.reason.clone(),
            },
            Some(entry) => TrustDecision::Untrusted {
                reason: entry.reason.clone(),
            },
            None => TrustDecision::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_normalizes_domain() {
        let registry = MemoryRegistry::new();
        let record = registry
            .insert("  EXAMPLE.ORG ", true, Some("district partner"), "admin-1")
            .unwrap();
        assert_eq!(record.domain, "example.org");
        assert_eq!(record.added_by, "admin-1");
    }

    #[test]
    fn test_duplicate_insert_conflicts() {
        let registry = MemoryRegistry::new();
        registry
            .insert("example.org", true, None, "admin-1")
            .unwrap();

        // Same domain after normalization must conflict, and the registry
        // must still contain exactly one row for it.
        let err = registry
            .insert(" Example.ORG ", false, None, "admin-2")
            .unwrap_err();
        assert_eq!(err.0, "example.org");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_decisions() {
        let registry = MemoryRegistry::new();
        registry
            .insert("trusted.org", true, Some("partner"), "admin-1")
            .unwrap();
        registry
            .insert("spammy.test", false, Some("known abuse"), "admin-1")
            .unwrap();

        assert_eq!(
            registry.lookup("trusted.org").await.unwrap(),
            TrustDecision::Trusted {
                reason: Some("partner".to_string())
            }
        );
        assert_eq!(
            registry.lookup("spammy.test").await.unwrap(),
            TrustDecision::Untrusted {
                reason: Some("known abuse".to_string())
            }
        );
        assert_eq!(
            registry.lookup("unknown.example").await.unwrap(),
            TrustDecision::Unknown
        );
    }

    #[tokio::test]
    async fn test_remove_reverts_to_unknown() {
        let registry = MemoryRegistry::new();
        registry
            .insert("trusted.org", true, None, "admin-1")
            .unwrap();

        assert!(registry.remove("TRUSTED.ORG").is_some());
        assert_eq!(
            registry.lookup("trusted.org").await.unwrap(),
            TrustDecision::Unknown
        );
        assert!(registry.remove("trusted.org").is_none());
    }
}
