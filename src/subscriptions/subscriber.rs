//! Subscribers and their delivery path.
//!
//! # Responsibilities
//! - Identify a subscriber by key and path
//! - Deliver updates through an external [`Transport`]
//! - Derive subscriber keys from the caller's context
//!
//! # Data Flow
//! ```text
//! SubscriberFactory::create(context, path)
//!     → KeyGenerator::generate_key(context)
//!     → TransportSubscriber { key, path, transport }
//!
//! Subscriber::notify(path, update)
//!     → Transport::send(key, path, Message)
//! ```

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::subscriptions::context::RequestContext;
use crate::subscriptions::error::DeliveryError;
use crate::subscriptions::update::{Message, Update};

/// A registered interest in one concrete path.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Stable identity derived from the caller.
    fn key(&self) -> &str;

    /// Concrete path this subscriber was created for.
    fn path(&self) -> &str;

    async fn notify(&self, path: &str, update: &Update) -> Result<(), DeliveryError>;
}

/// Shared subscriber compared by key and path.
#[derive(Clone)]
pub struct SubscriberHandle(Arc<dyn Subscriber>);

impl SubscriberHandle {
    pub fn new(subscriber: Arc<dyn Subscriber>) -> Self {
        Self(subscriber)
    }

    pub fn key(&self) -> &str {
        self.0.key()
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }

    pub async fn notify(&self, path: &str, update: &Update) -> Result<(), DeliveryError> {
        self.0.notify(path, update).await
    }
}

impl PartialEq for SubscriberHandle {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key() && self.path() == other.path()
    }
}

impl Eq for SubscriberHandle {}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("key", &self.key())
            .field("path", &self.path())
            .finish()
    }
}

impl fmt::Display for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.key(), self.path())
    }
}

impl<S: Subscriber + 'static> From<S> for SubscriberHandle {
    fn from(subscriber: S) -> Self {
        Self(Arc::new(subscriber))
    }
}

/// Builds subscribers at subscribe and unsubscribe time.
pub trait SubscriberFactory: Send + Sync {
    fn create(&self, context: &RequestContext, path: &str) -> SubscriberHandle;
}

/// Derives a subscriber key from the caller's context.
pub trait KeyGenerator: Send + Sync {
    fn generate_key(&self, context: &RequestContext) -> String;
}

/// Uses the session identifier as the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionKeyGenerator;

impl KeyGenerator for SessionKeyGenerator {
    fn generate_key(&self, context: &RequestContext) -> String {
        context.session_id.clone()
    }
}

/// Uses the value of one claim as the key, falling back to the session id.
#[derive(Debug, Clone)]
pub struct ClaimKeyGenerator {
    claim: String,
}

impl ClaimKeyGenerator {
    pub fn new(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
        }
    }
}

impl KeyGenerator for ClaimKeyGenerator {
    fn generate_key(&self, context: &RequestContext) -> String {
        context
            .claim(&self.claim)
            .map(str::to_string)
            .unwrap_or_else(|| context.session_id.clone())
    }
}

/// Push channel that reaches remote subscribers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, key: &str, path: &str, message: &Message) -> Result<(), DeliveryError>;
}

/// Subscriber that forwards every update to a shared transport.
pub struct TransportSubscriber {
    key: String,
    path: String,
    transport: Arc<dyn Transport>,
}

impl TransportSubscriber {
    pub fn new(key: impl Into<String>, path: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            transport,
        }
    }
}

#[async_trait]
impl Subscriber for TransportSubscriber {
    fn key(&self) -> &str {
        &self.key
    }

    fn path(&self) -> &str {
        &self.path
    }

    async fn notify(&self, _path: &str, update: &Update) -> Result<(), DeliveryError> {
        let message = Message::new(self.path.clone(), update.clone());
        tracing::debug!(
            path = %self.path,
            subscriber = %self.key,
            "Sending update notification"
        );
        self.transport.send(&self.key, &self.path, &message).await
    }
}

/// Factory combining a key generator with a transport.
pub struct TransportSubscriberFactory<K> {
    key_generator: K,
    transport: Arc<dyn Transport>,
}

impl<K: KeyGenerator> TransportSubscriberFactory<K> {
    pub fn new(key_generator: K, transport: Arc<dyn Transport>) -> Self {
        Self {
            key_generator,
            transport,
        }
    }
}

impl<K: KeyGenerator> SubscriberFactory for TransportSubscriberFactory<K> {
    fn create(&self, context: &RequestContext, path: &str) -> SubscriberHandle {
        TransportSubscriber::new(
            self.key_generator.generate_key(context),
            path,
            self.transport.clone(),
        )
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, String, Message)>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, key: &str, path: &str, message: &Message) -> Result<(), DeliveryError> {
            self.sent
                .lock()
                .await
                .push((key.to_string(), path.to_string(), message.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_key_generators() {
        let ctx = RequestContext::new("sess_1").with_claim("sub", "user_1");
        assert_eq!(SessionKeyGenerator.generate_key(&ctx), "sess_1");
        assert_eq!(ClaimKeyGenerator::new("sub").generate_key(&ctx), "user_1");
        assert_eq!(ClaimKeyGenerator::new("email").generate_key(&ctx), "sess_1");
    }

    #[test]
    fn test_handle_equality_by_key_and_path() {
        let transport: Arc<dyn Transport> = Arc::new(RecordingTransport::default());
        let a = SubscriberHandle::from(TransportSubscriber::new("k1", "p", transport.clone()));
        let b = SubscriberHandle::from(TransportSubscriber::new("k1", "p", transport.clone()));
        let c = SubscriberHandle::from(TransportSubscriber::new("k1", "q", transport.clone()));
        let d = SubscriberHandle::from(TransportSubscriber::new("k2", "p", transport));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.to_string(), "k1@p");
    }

    #[tokio::test]
    async fn test_factory_delivers_through_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let factory = TransportSubscriberFactory::new(SessionKeyGenerator, transport.clone());

        let subscriber = factory.create(&RequestContext::new("sess_9"), "employers/abc");
        assert_eq!(subscriber.key(), "sess_9");

        let update = Update::item_update(json!({ "name": "Acme" }));
        subscriber.notify("employers/abc", &update).await.unwrap();

        let sent = transport.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "sess_9");
        assert_eq!(sent[0].1, "employers/abc");
        assert_eq!(sent[0].2, Message::new("employers/abc", update));
    }
}
