//! Email syntax checks, domain extraction, and list parsing.
//!
//! Every comparison in the classification chain happens on lowercased,
//! trimmed domains; this module is the single place that normalization
//! lives.

use std::collections::HashSet;

use email_address::EmailAddress;
use tracing::{info, warn};

/// Extract the domain of an email address, lowercased.
///
/// Returns `None` unless the address parses as RFC 5322 `local@domain` and
/// the domain is a well-formed dotted hostname. Multiple `@` symbols split
/// on the last one, matching mailbox semantics.
pub fn domain_of(email: &str) -> Option<String> {
    let email = email.trim();
    if email.parse::<EmailAddress>().is_err() {
        return None;
    }

    let at_pos = email.rfind('@')?;
    let domain = email[at_pos + 1..].to_lowercase();

    if is_valid_domain_format(&domain) {
        Some(domain)
    } else {
        None
    }
}

/// Basic domain format validation
pub fn is_valid_domain_format(domain: &str) -> bool {
    if domain.len() > 253 || domain.is_empty() {
        return false;
    }

    // Must contain at least one dot
    if !domain.contains('.') {
        return false;
    }

    // Cannot start or end with dot or hyphen
    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return false;
    }

    // Check each label
    for label in domain.split('.') {
        if label.is_empty() || label.len() > 63 {
            return false;
        }

        // Labels cannot start or end with hyphen
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }

        // Labels must contain only alphanumeric characters and hyphens
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }

    true
}

/// Parse a domain-per-line list, tolerating comments and blank lines.
///
/// Accepts `#` and `//` comment prefixes so both bundled assets and the
/// common public blocklist formats parse with the same code.
pub fn parse_domain_list(content: &str) -> HashSet<String> {
    let mut domains = HashSet::new();
    let mut line_count = 0;
    let mut invalid_count = 0;

    for line in content.lines() {
        line_count += 1;
        let domain = line.trim();

        // Skip empty lines and comments
        if domain.is_empty() || domain.starts_with('#') || domain.starts_with("//") {
            continue;
        }

        if is_valid_domain_format(domain) {
            domains.insert(domain.to_lowercase());
        } else {
            invalid_count += 1;
            if invalid_count <= 10 {
                warn!("Invalid domain format at line {}: '{}'", line_count, domain);
            }
        }
    }

    if invalid_count > 10 {
        warn!("... and {} more invalid domain entries", invalid_count - 10);
    }

    info!(
        "Parsed {} valid domains from {} lines ({} invalid entries)",
        domains.len(),
        line_count,
        invalid_count
    );

    domains
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_domain_extraction() {
        assert_eq!(domain_of("staff@example.org"), Some("example.org".to_string()));
        assert_eq!(
            domain_of("Foo@Organization.ORG"),
            Some("organization.org".to_string())
        );
        assert_eq!(
            domain_of("  padded@example.org  "),
            Some("example.org".to_string())
        );
    }

    #[test]
    fn test_domain_extraction_rejects_malformed() {
        assert_eq!(domain_of(""), None);
        assert_eq!(domain_of("not-an-email"), None);
        assert_eq!(domain_of("@example.org"), None);
        assert_eq!(domain_of("user@"), None);
        assert_eq!(domain_of("user@nodot"), None);
        assert_eq!(domain_of("user@.example.org"), None);
        assert_eq!(domain_of("user@example.org."), None);
        assert_eq!(domain_of("user@exa mple.org"), None);
    }

    #[test]
    fn test_domain_format_validation() {
        assert!(is_valid_domain_format("example.com"));
        assert!(is_valid_domain_format("sub.example.com"));
        assert!(is_valid_domain_format("test-domain.co.uk"));

        assert!(!is_valid_domain_format(""));
        assert!(!is_valid_domain_format("no-dot"));
        assert!(!is_valid_domain_format(".example.com"));
        assert!(!is_valid_domain_format("example.com."));
        assert!(!is_valid_domain_format("-example.com"));
        assert!(!is_valid_domain_format("example.com-"));
        assert!(!is_valid_domain_format("ex ample.com"));
    }

    #[test]
    fn test_parse_domain_list() {
        let content = r#"
# This is a comment
// another comment style
10minutemail.com
guerrillamail.com

TempMail.Org
invalid_domain_without_dot
"#;

        let domains = parse_domain_list(content);
        assert_eq!(domains.len(), 3);
        assert!(domains.contains("10minutemail.com"));
        assert!(domains.contains("guerrillamail.com"));
        assert!(domains.contains("tempmail.org"));
        assert!(!domains.contains("invalid_domain_without_dot"));
    }
}
