//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (lock timeout > 0, metrics address parses)
//! - Check every subscription template against the path grammar
//! - Detect duplicate templates
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FabricConfig → Result<(), Vec<ValidationError>>
//! - Placeholder consistency is left to tree construction, which sees provider bindings

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::FabricConfig;
use crate::subscriptions::error::PathError;
use crate::subscriptions::path;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("registry.lock_timeout_ms must be greater than zero")]
    ZeroLockTimeout,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("subscription '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PathError,
    },

    #[error("subscription '{0}' is declared more than once")]
    DuplicatePath(String),

    #[error("subscription '{0}' has an empty provider name")]
    EmptyProvider(String),
}

/// Check `config` and collect every problem found.
pub fn validate_config(config: &FabricConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.registry.lock_timeout_ms == 0 {
        errors.push(ValidationError::ZeroLockTimeout);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in &config.subscriptions {
        match path::split(&entry.path, true) {
            Ok(segments) => {
                if !seen.insert(segments.join("/")) {
                    errors.push(ValidationError::DuplicatePath(entry.path.clone()));
                }
            }
            Err(source) => errors.push(ValidationError::InvalidPath {
                path: entry.path.clone(),
                source,
            }),
        }

        if entry.provider.trim().is_empty() {
            errors.push(ValidationError::EmptyProvider(entry.path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
