//! Trusted-domain persistence operations.
//!
//! All operations run against the `trusted_email_domains` table. Uniqueness
//! of `domain` is enforced by the database's unique index, not by an
//! application-level check-then-insert, so concurrent duplicate inserts
//! surface as a constraint violation which is mapped to [`DbError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Postgres};
use thiserror::Error;
use uuid::Uuid;

use trust_core::registry::{DomainTrustLookup, RegistryUnavailable, TrustDecision, TrustedDomain};

/// SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Store-level errors, kept distinct so callers can map them to specific
/// HTTP statuses instead of a generic failure.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("domain already exists")]
    Conflict,
    #[error("domain not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Filters and paging for the admin listing.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// 1-based page number.
    pub page: u32,
    /// Page size, already clamped by the route layer.
    pub limit: u32,
    /// Case-insensitive substring match over domain and reason.
    pub search: Option<String>,
    /// `Some(true)` = trusted only, `Some(false)` = untrusted only.
    pub trusted: Option<bool>,
}

/// One page of registry records plus the unfiltered-by-paging total.
#[derive(Debug)]
pub struct DomainPage {
    pub domains: Vec<TrustedDomain>,
    pub total: i64,
}

/// Partial update for a judgment. The domain string itself is immutable:
/// re-judging a domain must not silently rename it.
#[derive(Debug, Clone, Default)]
pub struct DomainPatch {
    pub is_trusted: Option<bool>,
    pub reason: Option<String>,
}

impl DomainPatch {
    pub fn is_empty(&self) -> bool {
        self.is_trusted.is_none() && self.reason.is_none()
    }
}

/// Postgres-backed registry store.
#[derive(Clone)]
pub struct DomainStore {
    pool: PgPool,
}

impl DomainStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// List judgments newest-first with optional search and trust filters.
    pub async fn list(&self, params: &ListParams) -> Result<DomainPage, DbError> {
        let offset = i64::from(params.page.saturating_sub(1)) * i64::from(params.limit);

        let mut query = QueryBuilder::new(
            "SELECT id, domain, is_trusted, reason, added_by, created_at, updated_at \
             FROM trusted_email_domains",
        );
        push_filters(&mut query, params);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(params.limit))
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<DomainRow> = query.build_query_as().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM trusted_email_domains");
        push_filters(&mut count, params);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(DomainPage {
            domains: rows.into_iter().map(DomainRow::into_record).collect(),
            total,
        })
    }

    /// Insert a new judgment. `domain` must already be trimmed and
    /// lowercased by the caller.
    pub async fn insert(
        &self,
        domain: &str,
        is_trusted: bool,
        reason: Option<&str>,
        added_by: &str,
    ) -> Result<TrustedDomain, DbError> {
        let row = sqlx::query_as::<_, DomainRow>(
            "INSERT INTO trusted_email_domains (domain, is_trusted, reason, added_by) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, domain, is_trusted, reason, added_by, created_at, updated_at",
        )
        .bind(domain)
        .bind(is_trusted)
        .bind(reason)
        .bind(added_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                DbError::Conflict
            }
            _ => DbError::Database(e),
        })?;

        Ok(row.into_record())
    }

    /// Re-judge a domain: trust flag and reason only.
    pub async fn update(&self, id: Uuid, patch: &DomainPatch) -> Result<TrustedDomain, DbError> {
        let row = sqlx::query_as::<_, DomainRow>(
            "UPDATE trusted_email_domains \
             SET is_trusted = COALESCE($2, is_trusted), \
                 reason = CASE WHEN $3 THEN $4 ELSE reason END, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING id, domain, is_trusted, reason, added_by, created_at, updated_at",
        )
        .bind(id)
        .bind(patch.is_trusted)
        .bind(patch.reason.is_some())
        .bind(patch.reason.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(row.into_record())
    }

    /// Remove a judgment, reverting the domain to "unknown". Deleting an
    /// already-absent id reports NotFound rather than failing opaquely.
    pub async fn delete(&self, id: Uuid) -> Result<TrustedDomain, DbError> {
        let row = sqlx::query_as::<_, DomainRow>(
            "DELETE FROM trusted_email_domains WHERE id = $1 \
             RETURNING id, domain, is_trusted, reason, added_by, created_at, updated_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(row.into_record())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, params: &ListParams) {
    query.push(" WHERE TRUE");

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        query
            .push(" AND (domain ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR reason ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(trusted) = params.trusted {
        query.push(" AND is_trusted = ").push_bind(trusted);
    }
}

/// The classifier's registry tier reads through the same store. Lookup
/// failures become [`RegistryUnavailable`], which the classifier treats as
/// "no entry" so classification keeps working through a database outage.
#[async_trait]
impl DomainTrustLookup for DomainStore {
    async fn lookup(&self, domain: &str) -> Result<TrustDecision, RegistryUnavailable> {
        let row: Option<(bool, Option<String>)> = sqlx::query_as(
            "SELECT is_trusted, reason FROM trusted_email_domains WHERE domain = $1",
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RegistryUnavailable(e.to_string()))?;

        Ok(match row {
            Some((true, reason)) => TrustDecision::Trusted { reason },
            Some((false, reason)) => TrustDecision::Untrusted { reason },
            None => TrustDecision::Unknown,
        })
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DomainRow {
    id: Uuid,
    domain: String,
    is_trusted: bool,
    reason: Option<String>,
    added_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DomainRow {
    fn into_record(self) -> TrustedDomain {
        TrustedDomain {
            id: self.id,
            domain: self.domain,
            is_trusted: self.is_trusted,
            reason: self.reason,
            added_by: self.added_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
