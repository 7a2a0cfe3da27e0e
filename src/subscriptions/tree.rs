//! Subscription tree.
//!
//! # Responsibilities
//! - Store registered templates as a trie of path segments
//! - Bind each complete template to exactly one provider
//! - Reject duplicate templates and inconsistent placeholder names
//!
//! # Design Decisions
//! - Nodes live in an arena addressed by [`NodeId`]; the trie is append-only
//! - Each node keeps literal children in a map plus at most one placeholder child
//! - Registration takes `&mut self`; once the tree is handed to a matcher it is frozen

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::SubscriptionConfig;
use crate::subscriptions::error::RegistrationError;
use crate::subscriptions::path::{self, PATH_SEPARATOR};
use crate::subscriptions::provider::{Provider, ProviderCatalog};

/// Index of a node in the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One segment position in the tree.
#[derive(Debug)]
pub struct TreeNode {
    value: String,
    provider: Option<Arc<dyn Provider>>,
    literals: HashMap<String, NodeId>,
    placeholder: Option<NodeId>,
}

impl TreeNode {
    fn new(value: String) -> Self {
        Self {
            value,
            provider: None,
            literals: HashMap::new(),
            placeholder: None,
        }
    }

    /// Segment text: lower-cased literal or `{name}` placeholder.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_placeholder(&self) -> bool {
        path::is_placeholder(&self.value)
    }

    /// Placeholder name without braces, if this is a placeholder node.
    pub fn placeholder_name(&self) -> Option<&str> {
        path::placeholder_name(&self.value)
    }

    pub fn provider(&self) -> Option<&Arc<dyn Provider>> {
        self.provider.as_ref()
    }

    pub fn literal_child(&self, segment: &str) -> Option<NodeId> {
        self.literals.get(segment).copied()
    }

    pub fn placeholder_child(&self) -> Option<NodeId> {
        self.placeholder
    }
}

/// Trie of registered subscription templates.
#[derive(Debug)]
pub struct SubscriptionTree {
    nodes: Vec<TreeNode>,
    registered: usize,
}

impl SubscriptionTree {
    /// Create a tree holding only the root sentinel.
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode::new(PATH_SEPARATOR.to_string())],
            registered: 0,
        }
    }

    /// Build a tree from configured templates, resolving providers by name.
    pub fn from_config(
        subscriptions: &[SubscriptionConfig],
        catalog: &ProviderCatalog,
    ) -> Result<Self, RegistrationError> {
        let mut tree = Self::new();
        for entry in subscriptions {
            let provider =
                catalog
                    .get(&entry.provider)
                    .ok_or_else(|| RegistrationError::UnknownProvider {
                        path: entry.path.clone(),
                        provider: entry.provider.clone(),
                    })?;
            tree.register_path(&entry.path, provider)?;
        }
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    /// Number of templates bound to a provider.
    pub fn len(&self) -> usize {
        self.registered
    }

    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }

    /// Register a template and bind it to `provider`.
    pub fn register_path(
        &mut self,
        template: &str,
        provider: Arc<dyn Provider>,
    ) -> Result<(), RegistrationError> {
        let segments = path::split(template, true)?;

        let mut names = HashSet::new();
        for name in segments.iter().filter_map(|s| path::placeholder_name(s)) {
            if !names.insert(name) {
                return Err(RegistrationError::DuplicatePlaceholder {
                    path: template.to_string(),
                    name: name.to_string(),
                });
            }
        }

        // Check every placeholder position before creating any node, so a
        // rejected template leaves the tree untouched.
        self.check_placeholders(template, &segments)?;

        let mut current = self.root();
        for segment in &segments {
            current = self.child_or_insert(current, segment);
        }

        let node = &mut self.nodes[current.0];
        if node.provider.is_some() {
            return Err(RegistrationError::DuplicatePath {
                path: template.to_string(),
            });
        }

        tracing::info!(
            path = %template,
            provider = %provider.name(),
            "Subscription path registered"
        );
        node.provider = Some(provider);
        self.registered += 1;
        Ok(())
    }

    fn check_placeholders(
        &self,
        template: &str,
        segments: &[String],
    ) -> Result<(), RegistrationError> {
        let mut current = Some(self.root());
        for segment in segments {
            let Some(id) = current else {
                break;
            };
            let node = self.node(id);

            if path::is_placeholder(segment) {
                if let Some(existing) = node.placeholder {
                    let existing = &self.node(existing).value;
                    if existing != segment {
                        return Err(RegistrationError::InconsistentPlaceholder {
                            path: template.to_string(),
                            existing: existing.clone(),
                            requested: segment.clone(),
                        });
                    }
                }
                current = node.placeholder;
            } else {
                current = node.literal_child(segment);
            }
        }
        Ok(())
    }

    fn child_or_insert(&mut self, parent: NodeId, segment: &str) -> NodeId {
        let is_placeholder = path::is_placeholder(segment);
        let existing = if is_placeholder {
            self.nodes[parent.0].placeholder
        } else {
            self.nodes[parent.0].literal_child(segment)
        };
        if let Some(id) = existing {
            return id;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode::new(segment.to_string()));

        let parent = &mut self.nodes[parent.0];
        if is_placeholder {
            parent.placeholder = Some(id);
        } else {
            parent.literals.insert(segment.to_string(), id);
        }
        id
    }
}

impl Default for SubscriptionTree {
    fn default() -> Self {
        Self::new()
    }
}
