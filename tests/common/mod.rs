//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use data_fabric::config::RegistryConfig;
use data_fabric::subscriptions::{
    Argument, DeliveryError, FnProvider, Message, ParameterKind, ParameterSpec, Provider,
    SessionKeyGenerator, SubscriptionManager, SubscriptionMatcher, SubscriptionTree, Transport,
    TransportSubscriberFactory,
};

/// Transport that records every message and fails for selected keys.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, Message)>>,
    failing: Vec<String>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Transport whose sends to any of `keys` fail.
    pub fn failing_for(keys: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::default(),
            failing: keys.iter().map(|k| k.to_string()).collect(),
        })
    }

    pub async fn sent(&self) -> Vec<(String, Message)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, key: &str) -> Vec<Message> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, key: &str, _path: &str, message: &Message) -> Result<(), DeliveryError> {
        if self.failing.iter().any(|k| k == key) {
            return Err(DeliveryError::new(format!("connection for {} closed", key)));
        }
        self.sent.lock().await.push((key.to_string(), message.clone()));
        Ok(())
    }
}

pub fn employee_snapshot(employer: &str, employee: &str) -> Value {
    json!({ "employer": employer, "employee": employee, "name": "some employee" })
}

/// Providers for the employer sample hierarchy.
pub fn employer_providers() -> Vec<(&'static str, Arc<dyn Provider>)> {
    vec![
        (
            "/employers",
            FnProvider::new("GetEmployers", vec![], |_| async {
                Ok(json!([{ "id": "acme" }]))
            })
            .shared(),
        ),
        (
            "/employers/{employerId}",
            FnProvider::new(
                "GetEmployer",
                vec![ParameterSpec::required("employerId", ParameterKind::Guid)],
                |args: Vec<Argument>| async move {
                    let id = args[0].as_guid().map(|g| g.to_string());
                    Ok(json!({ "id": id }))
                },
            )
            .shared(),
        ),
        (
            "/employers/{employerId}/employees",
            FnProvider::new(
                "GetEmployees",
                vec![
                    ParameterSpec::required("employerId", ParameterKind::Text),
                    ParameterSpec::optional("limit", ParameterKind::Integer),
                ],
                |args: Vec<Argument>| async move {
                    Ok(json!({
                        "employer": args[0].as_text(),
                        "limit": args[1].as_integer(),
                    }))
                },
            )
            .shared(),
        ),
        (
            "/employers/{employerId}/employees/{employeeId}",
            FnProvider::new(
                "GetEmployee",
                vec![
                    ParameterSpec::required("employerId", ParameterKind::Text),
                    ParameterSpec::required("employeeId", ParameterKind::Text),
                ],
                |args: Vec<Argument>| async move {
                    let employer = args[0].as_text().unwrap_or_default().to_string();
                    let employee = args[1].as_text().unwrap_or_default().to_string();
                    Ok(employee_snapshot(&employer, &employee))
                },
            )
            .shared(),
        ),
    ]
}

pub fn employer_tree() -> SubscriptionTree {
    let mut tree = SubscriptionTree::new();
    for (template, provider) in employer_providers() {
        tree.register_path(template, provider).unwrap();
    }
    tree
}

/// Manager over the employer tree keyed by session id.
pub fn employer_manager(transport: Arc<RecordingTransport>) -> SubscriptionManager {
    SubscriptionManager::new(
        SubscriptionMatcher::new(employer_tree()),
        Arc::new(TransportSubscriberFactory::new(SessionKeyGenerator, transport)),
        &RegistryConfig::default(),
    )
}
