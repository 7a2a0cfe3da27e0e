//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the fabric.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the data fabric.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FabricConfig {
    /// Subscriber registry settings.
    pub registry: RegistryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Subscription templates mapped to named providers.
    pub subscriptions: Vec<SubscriptionConfig>,
}

/// Subscriber registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Bounded wait for registry locks in milliseconds.
    pub lock_timeout_ms: u64,
}

impl RegistryConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 1000,
        }
    }
}

/// One subscription template.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubscriptionConfig {
    /// Template path, e.g. "/employers/{employerId}".
    pub path: String,

    /// Name of the provider that serves this template.
    pub provider: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default tracing filter; `RUST_LOG` takes precedence.
    pub log_filter: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "data_fabric=info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: FabricConfig = toml::from_str("").unwrap();
        assert_eq!(config.registry.lock_timeout(), Duration::from_millis(1000));
        assert_eq!(config.observability.log_filter, "data_fabric=info");
        assert!(config.subscriptions.is_empty());
    }

    #[test]
    fn test_parse_subscriptions() {
        let config: FabricConfig = toml::from_str(
            r#"
            [registry]
            lock_timeout_ms = 250

            [[subscriptions]]
            path = "/employers"
            provider = "get_employers"

            [[subscriptions]]
            path = "/employers/{employerId}"
            provider = "get_employer"
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.lock_timeout_ms, 250);
        assert_eq!(config.subscriptions.len(), 2);
        assert_eq!(config.subscriptions[1].path, "/employers/{employerId}");
        assert_eq!(config.subscriptions[1].provider, "get_employer");
    }
}
