//! Configuration management for the domain trust API
//!
//! This module handles loading configuration from environment variables
//! and configuration files using the figment crate.

use serde::{Deserialize, Serialize};
use trust_core::TrustConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub classification: ClassificationConfig,
    pub verification: VerificationConfig,
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: 30,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection URL
    pub url: String,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Connection acquire timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/volunteer_central".to_string(),
            max_connections: 5,
            connect_timeout_secs: 5,
        }
    }
}

/// Classification engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Remote disposable blocklist URL; empty disables the remote refresh
    pub blocklist_url: Option<String>,
    /// Timeout for a single blocklist fetch in milliseconds
    pub fetch_timeout_ms: u64,
    /// Age after which the disposable cache is refreshed, in seconds
    pub refresh_interval_secs: u64,
    /// Warm the disposable cache at startup instead of on first use
    pub preload_on_start: bool,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        let defaults = TrustConfig::default();
        Self {
            blocklist_url: defaults.blocklist_url,
            fetch_timeout_ms: defaults.fetch_timeout_ms,
            refresh_interval_secs: defaults.refresh_interval_secs,
            preload_on_start: true,
        }
    }
}

impl ClassificationConfig {
    /// Map into the engine's own configuration type.
    pub fn to_trust_config(&self) -> TrustConfig {
        TrustConfig {
            blocklist_url: self.blocklist_url.clone(),
            fetch_timeout_ms: self.fetch_timeout_ms,
            refresh_interval_secs: self.refresh_interval_secs,
            ..TrustConfig::default()
        }
    }
}

/// External mailbox-verification provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Provider endpoint
    pub endpoint: String,
    /// Provider API key; unset disables the external fallback tier.
    /// Server-side only, never exposed to clients.
    pub api_key: Option<String>,
    /// Provider request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.emaillistverify.com/api/verify".to_string(),
            api_key: None,
            timeout_ms: 4_000,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable JSON structured logging
    pub json_logs: bool,
    /// Log level filter
    pub log_level: String,
    /// Service name reported in logs and metrics
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_level: "info".to_string(),
            service_name: "domain-trust-api".to_string(),
        }
    }
}

/// Environment variable names for configuration
#[allow(dead_code)]
pub mod env_vars {
    pub const SERVER_HOST: &str = "TRUST_API_SERVER_HOST";
    pub const SERVER_PORT: &str = "TRUST_API_SERVER_PORT";
    pub const DATABASE_URL: &str = "TRUST_API_DATABASE_URL";
    pub const BLOCKLIST_URL: &str = "TRUST_API_CLASSIFICATION_BLOCKLIST_URL";
    pub const VERIFICATION_API_KEY: &str = "TRUST_API_VERIFICATION_API_KEY";
    pub const JSON_LOGS: &str = "TRUST_API_OBSERVABILITY_JSON_LOGS";
    pub const LOG_LEVEL: &str = "TRUST_API_OBSERVABILITY_LOG_LEVEL";
    pub const JWT_SECRET: &str = "JWT_SECRET";
    pub const ADMIN_USERNAME: &str = "ADMIN_API_USERNAME";
    pub const ADMIN_PASSWORD: &str = "ADMIN_API_PASSWORD";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.classification.preload_on_start);
        assert!(config.verification.api_key.is_none());
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn test_classification_config_maps_to_engine_config() {
        let config = ClassificationConfig {
            blocklist_url: Some("https://blocklist.example/list.txt".to_string()),
            fetch_timeout_ms: 250,
            refresh_interval_secs: 60,
            preload_on_start: false,
        };
        let trust = config.to_trust_config();
        assert_eq!(
            trust.blocklist_url.as_deref(),
            Some("https://blocklist.example/list.txt")
        );
        assert_eq!(trust.fetch_timeout_ms, 250);
        assert_eq!(trust.refresh_interval_secs, 60);
    }

    #[test]
    fn test_verification_config_defaults() {
        let config = VerificationConfig::default();
        assert!(config.endpoint.contains("emaillistverify"));
        assert_eq!(config.timeout_ms, 4_000);
    }
}
