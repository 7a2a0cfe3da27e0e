//! Subscription routing subsystem.
//!
//! # Data Flow
//! ```text
//! Setup (single-threaded, before traffic):
//!     templates + providers
//!     → tree.rs (register, reject duplicates / inconsistent placeholders)
//!     → matcher.rs (tree frozen behind Arc)
//!
//! Subscribe:
//!     manager.rs → matcher.rs (path → InvocationDescriptor)
//!     → binder.rs (coerce values, invoke provider → snapshot)
//!     → collection.rs (register subscriber for the path)
//!
//! Notify:
//!     manager.rs → collection.rs (snapshot subscribers)
//!     → subscriber.rs (deliver through the transport, one by one)
//! ```
//!
//! # Design Decisions
//! - Tree is immutable once serving starts, so matching takes no locks
//! - Each path has its own subscriber lock; contention is partitioned by path
//! - Lock waits are bounded; delivery never runs under a lock

pub mod binder;
pub mod collection;
pub mod context;
pub mod error;
pub mod manager;
pub mod matcher;
pub mod path;
pub mod provider;
pub mod subscriber;
pub mod tree;
pub mod update;

pub use collection::ConcurrentCollection;
pub use context::RequestContext;
pub use error::{
    BindError, DeliveryError, MatchError, PathError, ProviderError, RegistrationError,
    SubscriptionError, SubscriptionErrorKind,
};
pub use manager::SubscriptionManager;
pub use matcher::{InvocationDescriptor, SubscriptionMatcher};
pub use provider::{Argument, FnProvider, ParameterKind, ParameterSpec, Provider, ProviderCatalog};
pub use subscriber::{
    ClaimKeyGenerator, KeyGenerator, SessionKeyGenerator, Subscriber, SubscriberFactory,
    SubscriberHandle, Transport, TransportSubscriber, TransportSubscriberFactory,
};
pub use tree::SubscriptionTree;
pub use update::{Message, QueryParameters, UnknownUpdateKind, Update, UpdateKind};
