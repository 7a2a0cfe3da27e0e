//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FabricConfig (validated, immutable)
//!     → SubscriptionTree::from_config + SubscriptionManager::new
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; the subscription tree it produces is frozen
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::FabricConfig;
pub use schema::ObservabilityConfig;
pub use schema::RegistryConfig;
pub use schema::SubscriptionConfig;
