//! Disposable-domain reference set with best-effort remote refresh.
//!
//! Membership checks run against an immutable in-memory snapshot. A refresh
//! builds a brand-new set from the remote blocklist merged over the bundled
//! fallback list, then swaps the snapshot reference in one step, so readers
//! see either the old or the new set and never a partially-populated one.
//!
//! Remote failures are logged and swallowed: classification must keep
//! working from the bundled list when the network is unreachable.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{syntax, TrustConfig};

static BUNDLED_LIST: &str = include_str!("../data/disposable_domains.txt");

/// Lifecycle of the remote-backed cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No remote fetch attempted yet; bundled list in effect.
    Cold,
    /// A fetch is in flight; bundled (or previous) snapshot in effect.
    Loading,
    /// A fetch completed (successfully or not) within the refresh interval.
    Warm,
}

impl CacheState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheState::Cold => "cold",
            CacheState::Loading => "loading",
            CacheState::Warm => "warm",
        }
    }
}

struct Snapshot {
    domains: Arc<HashSet<String>>,
    /// When the last fetch attempt finished. `None` until the first attempt.
    fetched_at: Option<Instant>,
    /// Whether the current snapshot includes remote data.
    remote_loaded: bool,
}

struct SetInner {
    snapshot: RwLock<Snapshot>,
    state: RwLock<CacheState>,
    /// Collapses concurrent refresh attempts into one fetch.
    refresh_gate: tokio::sync::Mutex<()>,
    http: reqwest::Client,
    blocklist_url: Option<String>,
    fetch_timeout: Duration,
    refresh_interval: Duration,
    bundled: Arc<HashSet<String>>,
}

/// Process-wide disposable-domain cache. Cheap to clone; clones share the
/// same snapshot.
#[derive(Clone)]
pub struct DisposableDomainSet {
    inner: Arc<SetInner>,
}

impl DisposableDomainSet {
    /// Build the set from the bundled list and the configured remote source.
    /// No network I/O happens here; the remote list is fetched lazily.
    pub fn new(config: &TrustConfig) -> Result<Self> {
        let bundled = syntax::parse_domain_list(BUNDLED_LIST);
        if bundled.is_empty() {
            anyhow::bail!("bundled disposable-domain list is empty");
        }
        let bundled = Arc::new(bundled);

        let fetch_timeout = Duration::from_millis(config.fetch_timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .context("failed to build HTTP client for blocklist fetches")?;

        debug!(
            "Disposable set initialized with {} bundled domains, remote source: {}",
            bundled.len(),
            config.blocklist_url.as_deref().unwrap_or("none")
        );

        Ok(Self {
            inner: Arc::new(SetInner {
                snapshot: RwLock::new(Snapshot {
                    domains: bundled.clone(),
                    fetched_at: None,
                    remote_loaded: false,
                }),
                state: RwLock::new(CacheState::Cold),
                refresh_gate: tokio::sync::Mutex::new(()),
                http,
                blocklist_url: config.blocklist_url.clone(),
                fetch_timeout,
                refresh_interval: Duration::from_secs(config.refresh_interval_secs),
                bundled,
            }),
        })
    }

    /// Synchronous membership check against the current snapshot.
    /// Never performs I/O and never blocks on the network.
    pub fn is_disposable_sync(&self, email: &str) -> bool {
        let Some(domain) = syntax::domain_of(email) else {
            return false;
        };
        self.current().contains(&domain)
    }

    /// Comprehensive membership check. If the cache is cold or stale, awaits
    /// one bounded fetch attempt first; always returns a boolean.
    pub async fn is_disposable(&self, email: &str) -> bool {
        let Some(domain) = syntax::domain_of(email) else {
            return false;
        };
        if self.needs_refresh() {
            self.refresh(false).await;
        }
        self.current().contains(&domain)
    }

    /// Warm the cache ahead of time. Idempotent: a warm or loading cache is
    /// left alone, so this is safe to call speculatively.
    pub async fn preload(&self) {
        if self.needs_refresh() {
            self.refresh(false).await;
        }
    }

    /// Force a refresh regardless of cache age (admin surface).
    pub async fn force_refresh(&self) {
        self.refresh(true).await;
    }

    /// Number of domains in the current snapshot.
    pub fn domain_count(&self) -> usize {
        self.current().len()
    }

    pub fn state(&self) -> CacheState {
        *read_lock(&self.inner.state)
    }

    /// Whether the current snapshot includes remote data.
    pub fn remote_loaded(&self) -> bool {
        read_lock(&self.inner.snapshot).remote_loaded
    }

    fn current(&self) -> Arc<HashSet<String>> {
        read_lock(&self.inner.snapshot).domains.clone()
    }

    fn needs_refresh(&self) -> bool {
        if self.inner.blocklist_url.is_none() {
            // Nothing to fetch; mark warm on first query so state reporting
            // reflects that the bundled list is authoritative.
            return *read_lock(&self.inner.state) == CacheState::Cold;
        }
        let snapshot = read_lock(&self.inner.snapshot);
        match snapshot.fetched_at {
            None => true,
            Some(at) => at.elapsed() >= self.inner.refresh_interval,
        }
    }

    async fn refresh(&self, forced: bool) {
        let _gate = self.inner.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited on the gate.
        if !forced && !self.needs_refresh() {
            return;
        }

        let Some(url) = self.inner.blocklist_url.as_deref() else {
            debug!("No remote blocklist configured; bundled list is authoritative");
            *write_lock(&self.inner.state) = CacheState::Warm;
            return;
        };

        *write_lock(&self.inner.state) = CacheState::Loading;

        let (snapshot, remote_loaded) = match self.fetch_remote(url).await {
            Ok(remote) => {
                let mut merged: HashSet<String> = self.inner.bundled.as_ref().clone();
                let remote_count = remote.len();
                merged.extend(remote);
                info!(
                    "Loaded {} disposable domains ({} remote, {} bundled)",
                    merged.len(),
                    remote_count,
                    self.inner.bundled.len()
                );
                (Arc::new(merged), true)
            }
            Err(e) => {
                warn!("Disposable blocklist fetch failed, keeping current snapshot: {e:#}");
                // Keep whatever we had; record the attempt so every check
                // does not retry until the interval elapses again.
                (self.current(), read_lock(&self.inner.snapshot).remote_loaded)
            }
        };

        {
            let mut guard = write_lock(&self.inner.snapshot);
            *guard = Snapshot {
                domains: snapshot,
                fetched_at: Some(Instant::now()),
                remote_loaded,
            };
        }
        *write_lock(&self.inner.state) = CacheState::Warm;
    }

    async fn fetch_remote(&self, url: &str) -> Result<HashSet<String>> {
        debug!("Fetching disposable blocklist from {}", url);
        let response = self
            .inner
            .http
            .get(url)
            .timeout(self.inner.fetch_timeout)
            .send()
            .await
            .context("blocklist request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("blocklist source returned HTTP {}", response.status());
        }

        let body = response.text().await.context("blocklist body unreadable")?;
        let domains = syntax::parse_domain_list(&body);
        if domains.is_empty() {
            anyhow::bail!("blocklist source returned no usable domains");
        }
        Ok(domains)
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
