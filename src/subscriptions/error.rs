//! Subscription error taxonomy.
//!
//! # Propagation
//! - Grammar and registration errors are fatal at startup
//! - Match and bind errors reach the subscribing caller wrapped in [`SubscriptionError`]
//! - Delivery failures are aggregated per broadcast and only logged by the manager
//! - Lock timeouts on add/remove surface as `false`, never as an error

use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Grammar violations found while splitting a subscription path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Path is empty, whitespace, or nothing but separators.
    #[error("subscription path cannot be empty")]
    Empty,

    /// Path contains `//`.
    #[error("subscription path cannot contain empty segments")]
    EmptySegment,

    /// Registered template starts with a placeholder.
    #[error("subscription path cannot start with a placeholder")]
    LeadingPlaceholder,

    /// Template segment has stray, nested or empty braces.
    #[error("subscription path contains ill-formed placeholder '{segment}'")]
    IllFormedPlaceholder { segment: String },

    /// Concrete request path contains a brace character.
    #[error("invalid subscription path; segment '{segment}' cannot contain '{{' or '}}'")]
    PlaceholderInRequest { segment: String },
}

/// Conflicts detected while registering a template into the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("subscription path '{path}' already exists")]
    DuplicatePath { path: String },

    #[error("unexpected placeholder '{requested}' in '{path}'; placeholders must be consistent for a given path (existing '{existing}')")]
    InconsistentPlaceholder {
        path: String,
        existing: String,
        requested: String,
    },

    #[error("placeholder '{name}' appears more than once in '{path}'")]
    DuplicatePlaceholder { path: String, name: String },

    #[error("subscription path '{path}' refers to unknown provider '{provider}'")]
    UnknownProvider { path: String, provider: String },
}

/// Failure to resolve a concrete path against the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error(transparent)]
    InvalidArgument(#[from] PathError),

    #[error("unable to match path '{path}' against available subscriptions")]
    PathNotFound { path: String },
}

/// Failure raised by a provider while producing its snapshot.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping it reachable through `source()`.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Failure to fill in or call a provider.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("missing parameter '{name}'")]
    MissingParameter { name: String },

    #[error("invalid value '{value}' for parameter '{name}': {reason}")]
    InvalidParameterValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("provider '{provider}' failed")]
    ProviderInvocationFailed {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

/// Coarse classification of a [`SubscriptionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionErrorKind {
    InvalidPath,
    PathNotFound,
    MissingParameter,
    InvalidParameterValue,
    ProviderInvocationFailed,
}

/// A rejected subscription request.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("subscription failed: {0}")]
    Match(#[from] MatchError),

    #[error("subscription failed: {0}")]
    Bind(#[from] BindError),
}

impl SubscriptionError {
    pub fn kind(&self) -> SubscriptionErrorKind {
        match self {
            SubscriptionError::Match(MatchError::InvalidArgument(_)) => {
                SubscriptionErrorKind::InvalidPath
            }
            SubscriptionError::Match(MatchError::PathNotFound { .. }) => {
                SubscriptionErrorKind::PathNotFound
            }
            SubscriptionError::Bind(BindError::MissingParameter { .. }) => {
                SubscriptionErrorKind::MissingParameter
            }
            SubscriptionError::Bind(BindError::InvalidParameterValue { .. }) => {
                SubscriptionErrorKind::InvalidParameterValue
            }
            SubscriptionError::Bind(BindError::ProviderInvocationFailed { .. }) => {
                SubscriptionErrorKind::ProviderInvocationFailed
            }
        }
    }
}

/// Bounded wait on a collection lock ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unable to lock collection within {0:?}")]
pub struct LockTimeout(pub Duration);

/// Failure of a snapshot-then-iterate pass over a collection.
#[derive(Debug, Error)]
pub enum ForEachError<E: StdError + 'static> {
    #[error(transparent)]
    Lock(#[from] LockTimeout),

    #[error("{} of the collection actions failed", .0.len())]
    Aggregate(Vec<E>),
}

impl<E: StdError + 'static> ForEachError<E> {
    /// Individual failures collected during iteration; empty for a lock timeout.
    pub fn failures(&self) -> &[E] {
        match self {
            ForEachError::Lock(_) => &[],
            ForEachError::Aggregate(errors) => errors,
        }
    }
}

/// Failure reported by a transport while delivering one notification.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DeliveryError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// A delivery failure attributed to one subscriber.
#[derive(Debug, Error)]
#[error("delivery to subscriber '{key}' failed")]
pub struct DeliveryFailure {
    pub key: String,
    #[source]
    pub source: DeliveryError,
}

/// Aggregate of per-subscriber failures from one broadcast.
pub type PartialDeliveryFailure = ForEachError<DeliveryFailure>;
