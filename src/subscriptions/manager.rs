//! Subscription manager.
//!
//! # Responsibilities
//! - Subscribe: match, bind, invoke, register the subscriber, return the snapshot
//! - Unsubscribe: remove the caller's subscriber for a path
//! - Notify: fan an update out to every subscriber of a path
//!
//! # Design Decisions
//! - One subscriber collection per normalized path, created on first subscribe
//!   and kept for the life of the manager
//! - The tree is frozen inside the matcher; the manager offers no registration
//! - Subscribe and unsubscribe are idempotent
//! - Notify is best effort: partial delivery failures are logged, not returned

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RegistryConfig;
use crate::observability::metrics;
use crate::subscriptions::binder;
use crate::subscriptions::collection::ConcurrentCollection;
use crate::subscriptions::context::RequestContext;
use crate::subscriptions::error::{
    DeliveryFailure, ForEachError, MatchError, PartialDeliveryFailure, SubscriptionError,
};
use crate::subscriptions::matcher::{InvocationDescriptor, SubscriptionMatcher};
use crate::subscriptions::path;
use crate::subscriptions::subscriber::{SubscriberFactory, SubscriberHandle};
use crate::subscriptions::update::{QueryParameters, Update};

/// Subscribers registered against one concrete path.
#[derive(Debug)]
pub struct SubscriberCollection {
    inner: ConcurrentCollection<SubscriberHandle>,
}

impl SubscriberCollection {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            inner: ConcurrentCollection::with_lock_timeout(lock_timeout),
        }
    }

    pub fn subscribers(&self) -> &ConcurrentCollection<SubscriberHandle> {
        &self.inner
    }

    /// Deliver `update` to every subscriber, continuing past failures.
    pub async fn notify_all(&self, path: &str, update: &Update) -> Result<(), PartialDeliveryFailure> {
        self.inner
            .for_each_async(|subscriber| async move {
                match subscriber.notify(path, update).await {
                    Ok(()) => {
                        metrics::record_delivery("ok");
                        Ok(())
                    }
                    Err(source) => {
                        metrics::record_delivery("failed");
                        Err(DeliveryFailure {
                            key: subscriber.key().to_string(),
                            source,
                        })
                    }
                }
            })
            .await
    }
}

/// What happened to the caller's subscriber during a subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddOutcome {
    Added,
    AlreadyPresent,
    LockTimeout,
}

impl AddOutcome {
    fn as_str(self) -> &'static str {
        match self {
            AddOutcome::Added => "added",
            AddOutcome::AlreadyPresent => "present",
            AddOutcome::LockTimeout => "lock_timeout",
        }
    }
}

/// Entry point for subscribe, unsubscribe and notify traffic.
pub struct SubscriptionManager {
    matcher: SubscriptionMatcher,
    factory: Arc<dyn SubscriberFactory>,
    subscriptions: DashMap<String, Arc<SubscriberCollection>>,
    lock_timeout: Duration,
}

impl SubscriptionManager {
    pub fn new(
        matcher: SubscriptionMatcher,
        factory: Arc<dyn SubscriberFactory>,
        config: &RegistryConfig,
    ) -> Self {
        metrics::record_registered_paths(matcher.tree().len());
        Self {
            matcher,
            factory,
            subscriptions: DashMap::new(),
            lock_timeout: config.lock_timeout(),
        }
    }

    /// Resolve a path without subscribing.
    pub fn match_path(&self, path: &str) -> Result<InvocationDescriptor, MatchError> {
        self.matcher.match_path(path)
    }

    /// Subscribe the caller to `path` and return the current snapshot.
    ///
    /// Subscribing twice with the same identity returns a fresh snapshot each
    /// time but keeps a single subscriber entry.
    pub async fn subscribe(
        &self,
        context: &RequestContext,
        path: &str,
        query: &QueryParameters,
    ) -> Result<Value, SubscriptionError> {
        match self.try_subscribe(context, path, query).await {
            Ok((snapshot, _)) => Ok(snapshot),
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Failed to add subscription");
                metrics::record_subscription("failed");
                Err(e)
            }
        }
    }

    async fn try_subscribe(
        &self,
        context: &RequestContext,
        path: &str,
        query: &QueryParameters,
    ) -> Result<(Value, AddOutcome), SubscriptionError> {
        let descriptor = self.matcher.match_path(path)?;
        let snapshot = binder::invoke(&descriptor, query, context).await?;

        // Matching succeeded, so the path is known to satisfy the request grammar.
        let key = path::normalize(path).map_err(MatchError::from)?;
        let collection = self.collection_or_insert(&key);

        let subscriber = self.factory.create(context, &key);
        let outcome = match collection.subscribers().add(subscriber.clone(), true).await {
            Ok(true) => AddOutcome::Added,
            Ok(false) => AddOutcome::AlreadyPresent,
            Err(_) => AddOutcome::LockTimeout,
        };

        if outcome == AddOutcome::LockTimeout {
            tracing::warn!(
                path = %key,
                subscriber = %subscriber.key(),
                "Subscriber not registered; snapshot returned without updates"
            );
        } else {
            tracing::info!(
                path = %key,
                subscriber = %subscriber.key(),
                already_present = outcome == AddOutcome::AlreadyPresent,
                "Subscription added"
            );
        }
        metrics::record_subscription(outcome.as_str());

        Ok((snapshot, outcome))
    }

    /// Remove the caller's subscriber for `path`, if any.
    pub async fn unsubscribe(&self, context: &RequestContext, path: &str) {
        let Ok(key) = path::normalize(path) else {
            tracing::debug!(path = %path, "Unsubscribe ignored for invalid path");
            return;
        };
        let Some(collection) = self.collection(&key) else {
            return;
        };

        let subscriber = self.factory.create(context, &key);
        let removed = collection.subscribers().try_remove(&subscriber).await;

        tracing::info!(
            path = %key,
            subscriber = %subscriber.key(),
            removed,
            "Subscription removed"
        );
        if removed {
            metrics::record_unsubscription();
        }
    }

    /// Deliver `update` to every subscriber of `path`.
    pub async fn notify(&self, path: &str, update: &Update) {
        let Ok(key) = path::normalize(path) else {
            tracing::debug!(path = %path, "Notify ignored for invalid path");
            return;
        };
        let Some(collection) = self.collection(&key) else {
            return;
        };

        metrics::record_notification();
        match collection.notify_all(&key, update).await {
            Ok(()) => {}
            Err(ForEachError::Lock(e)) => {
                tracing::error!(path = %key, error = %e, "Notification skipped");
            }
            Err(e @ ForEachError::Aggregate(_)) => {
                for failure in e.failures() {
                    tracing::warn!(
                        path = %key,
                        subscriber = %failure.key,
                        error = %failure.source,
                        "Notification delivery failed"
                    );
                }
                tracing::error!(path = %key, error = %e, "One or more notifications failed");
            }
        }
    }

    /// Number of subscribers currently registered for `path`.
    pub async fn subscriber_count(&self, path: &str) -> usize {
        let Some(collection) = path::normalize(path).ok().and_then(|key| self.collection(&key)) else {
            return 0;
        };
        collection.subscribers().len().await.unwrap_or(0)
    }

    /// Normalized paths that have had at least one subscriber.
    pub fn paths(&self) -> Vec<String> {
        self.subscriptions.iter().map(|e| e.key().clone()).collect()
    }

    // The map guard is dropped before returning so no shard lock is held
    // across an await.
    fn collection(&self, key: &str) -> Option<Arc<SubscriberCollection>> {
        self.subscriptions.get(key).map(|e| e.value().clone())
    }

    fn collection_or_insert(&self, key: &str) -> Arc<SubscriberCollection> {
        self.subscriptions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(SubscriberCollection::new(self.lock_timeout)))
            .value()
            .clone()
    }
}
