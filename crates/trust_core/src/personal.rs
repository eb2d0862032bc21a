//! Personal-provider reference set.
//!
//! Consumer webmail domains (Gmail, Yahoo, regional providers) are never
//! acceptable as hour-verification sources, regardless of any other signal.
//! The list is a bundled static asset loaded once per process; it has no
//! remote component because it changes on the timescale of years.

use std::collections::HashSet;
use std::sync::LazyLock;

use tracing::debug;

use crate::syntax;

static BUNDLED_LIST: &str = include_str!("../data/personal_providers.txt");

static BUNDLED: LazyLock<PersonalProviderSet> = LazyLock::new(|| {
    let set = PersonalProviderSet::from_list(BUNDLED_LIST);
    debug!("Personal-provider set initialized with {} domains", set.len());
    set
});

/// Membership set of well-known consumer webmail domains.
pub struct PersonalProviderSet {
    domains: HashSet<String>,
}

impl PersonalProviderSet {
    /// The process-wide set parsed from the bundled asset.
    pub fn bundled() -> &'static PersonalProviderSet {
        &BUNDLED
    }

    /// Build a set from a domain-per-line list (used for custom deployments
    /// and tests).
    pub fn from_list(content: &str) -> Self {
        Self {
            domains: syntax::parse_domain_list(content),
        }
    }

    /// Check whether a domain belongs to a consumer webmail provider.
    pub fn contains_domain(&self, domain: &str) -> bool {
        self.domains.contains(&domain.to_lowercase())
    }

    /// Check whether an email address is hosted by a consumer webmail
    /// provider. Unparsable addresses are not personal.
    pub fn contains_email(&self, email: &str) -> bool {
        match syntax::domain_of(email) {
            Some(domain) => self.domains.contains(&domain),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_set_loads() {
        let set = PersonalProviderSet::bundled();
        assert!(set.len() > 100);
        assert!(set.contains_domain("gmail.com"));
        assert!(set.contains_domain("yahoo.co.uk"));
        assert!(set.contains_domain("qq.com"));
    }

    #[test]
    fn test_case_insensitive_membership() {
        let set = PersonalProviderSet::bundled();
        assert!(set.contains_domain("GMAIL.COM"));
        assert!(set.contains_email("Student@Gmail.Com"));
    }

    #[test]
    fn test_organizational_domains_not_personal() {
        let set = PersonalProviderSet::bundled();
        assert!(!set.contains_domain("example.org"));
        assert!(!set.contains_domain("school.edu"));
        assert!(!set.contains_email("coordinator@foodbank.org"));
    }

    #[test]
    fn test_malformed_email_not_personal() {
        let set = PersonalProviderSet::bundled();
        assert!(!set.contains_email(""));
        assert!(!set.contains_email("gmail.com"));
    }
}
