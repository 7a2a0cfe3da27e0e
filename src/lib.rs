//! Subscription routing core for a real-time data fabric.
//!
//! Providers are registered against parameterized paths such as
//! `/employers/{employerId}/employees/{employeeId}`. Subscribers ask for a
//! concrete path, receive the current snapshot from the matched provider, and
//! are then notified of every update published for that path.

pub mod config;
pub mod observability;
pub mod subscriptions;

pub use config::FabricConfig;
pub use subscriptions::{SubscriptionManager, SubscriptionMatcher, SubscriptionTree};
