//! Request-time path matching.
//!
//! # Responsibilities
//! - Walk the tree against a concrete request path
//! - Resolve placeholder segments into named parameter values
//! - Return an invocation descriptor or an explicit no-match
//!
//! # Design Decisions
//! - An exact literal child always wins over the placeholder sibling
//! - No backtracking: one pass, one candidate per segment
//! - Read-only over a frozen tree, so any number of callers may match concurrently

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::subscriptions::error::MatchError;
use crate::subscriptions::path;
use crate::subscriptions::provider::Provider;
use crate::subscriptions::tree::SubscriptionTree;

/// Matched provider plus the placeholder values extracted from the path.
#[derive(Clone)]
pub struct InvocationDescriptor {
    provider: Arc<dyn Provider>,
    parameters: IndexMap<String, String>,
}

impl InvocationDescriptor {
    pub fn new(provider: Arc<dyn Provider>, parameters: IndexMap<String, String>) -> Self {
        Self {
            provider,
            parameters,
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Parameter values in path order.
    pub fn parameters(&self) -> &IndexMap<String, String> {
        &self.parameters
    }

    pub fn into_parts(self) -> (Arc<dyn Provider>, IndexMap<String, String>) {
        (self.provider, self.parameters)
    }
}

impl fmt::Display for InvocationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.provider.name())?;
        for (i, (key, value)) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for InvocationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Matches concrete paths against a frozen [`SubscriptionTree`].
#[derive(Debug, Clone)]
pub struct SubscriptionMatcher {
    tree: Arc<SubscriptionTree>,
}

impl SubscriptionMatcher {
    /// Freeze `tree` for matching. No further registration is possible.
    pub fn new(tree: SubscriptionTree) -> Self {
        Self {
            tree: Arc::new(tree),
        }
    }

    pub fn tree(&self) -> &SubscriptionTree {
        &self.tree
    }

    /// Resolve `path` to its provider and placeholder values.
    pub fn match_path(&self, request: &str) -> Result<InvocationDescriptor, MatchError> {
        let segments = path::split_raw(request, false)?;
        let not_found = || MatchError::PathNotFound {
            path: request.to_string(),
        };

        let mut parameters = IndexMap::new();
        let mut current = self.tree.root();

        for segment in segments {
            let node = self.tree.node(current);
            let literal = segment.to_lowercase();

            current = match node.literal_child(&literal) {
                Some(child) => child,
                None => {
                    let child = node.placeholder_child().ok_or_else(not_found)?;
                    if let Some(name) = self.tree.node(child).placeholder_name() {
                        parameters.insert(name.to_string(), segment.to_string());
                    }
                    child
                }
            };
        }

        let provider = self.tree.node(current).provider().cloned().ok_or_else(not_found)?;

        let descriptor = InvocationDescriptor::new(provider, parameters);
        tracing::debug!(path = %request, invocation = %descriptor, "Subscription path matched");
        Ok(descriptor)
    }
}
