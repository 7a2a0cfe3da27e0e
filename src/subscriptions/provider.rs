//! Data provider contract.
//!
//! # Responsibilities
//! - Declare the parameters a provider expects (name, kind, required)
//! - Carry typed arguments into the provider once bound
//! - Produce the current snapshot for a matched path
//!
//! # Design Decisions
//! - Parameter kinds are a closed set; binding is a match over [`ParameterKind`]
//! - Providers are shared as `Arc<dyn Provider>`; the tree never owns their state

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

use crate::subscriptions::context::RequestContext;
use crate::subscriptions::error::ProviderError;

/// Target type of a declared provider parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Receives the caller's [`RequestContext`] instead of a named value.
    Context,
    Guid,
    Integer,
    /// Normalized to UTC.
    Timestamp,
    Text,
}

/// One declared provider parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    pub fn context() -> Self {
        Self::required("context", ParameterKind::Context)
    }
}

/// A bound argument, in declared parameter order.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Context(RequestContext),
    Guid(Uuid),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Text(String),
    /// Optional parameter with no supplied value.
    Absent,
}

impl Argument {
    pub fn as_context(&self) -> Option<&RequestContext> {
        match self {
            Argument::Context(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            Argument::Guid(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Argument::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Argument::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Argument::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Argument::Absent)
    }
}

/// Backing source of the snapshot for a subscription path.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name used in logs and configuration.
    fn name(&self) -> &str;

    fn parameters(&self) -> &[ParameterSpec];

    /// Produce the current data for the bound arguments.
    async fn invoke(&self, args: Vec<Argument>) -> Result<Value, ProviderError>;
}

impl fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name())
            .field("parameters", &self.parameters())
            .finish()
    }
}

type ProviderFuture = Pin<Box<dyn Future<Output = Result<Value, ProviderError>> + Send>>;
type ProviderFn = dyn Fn(Vec<Argument>) -> ProviderFuture + Send + Sync;

/// Provider backed by an async closure.
pub struct FnProvider {
    name: String,
    parameters: Vec<ParameterSpec>,
    f: Box<ProviderFn>,
}

impl FnProvider {
    pub fn new<F, Fut>(name: impl Into<String>, parameters: Vec<ParameterSpec>, f: F) -> Self
    where
        F: Fn(Vec<Argument>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ProviderError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            parameters,
            f: Box::new(move |args| Box::pin(f(args))),
        }
    }

    /// Wrap into the shared form the tree stores.
    pub fn shared(self) -> Arc<dyn Provider> {
        Arc::new(self)
    }
}

#[async_trait]
impl Provider for FnProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    async fn invoke(&self, args: Vec<Argument>) -> Result<Value, ProviderError> {
        (self.f)(args).await
    }
}

/// Named providers available to config-driven registration.
#[derive(Default)]
pub struct ProviderCatalog {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider under its own name, replacing any previous entry.
    pub fn insert(&mut self, provider: Arc<dyn Provider>) -> &mut Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl FromIterator<Arc<dyn Provider>> for ProviderCatalog {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Provider>>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for provider in iter {
            catalog.insert(provider);
        }
        catalog
    }
}
