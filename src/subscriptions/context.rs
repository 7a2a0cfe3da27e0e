//! Caller context attached to subscription requests.

use std::collections::HashMap;

/// Identity of the caller behind a subscribe or unsubscribe request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Transport session identifier.
    pub session_id: String,
    pub user_id: Option<String>,
    pub tenant_id: Option<String>,
    /// Authenticated claims, keyed by claim type.
    pub claims: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_claim(mut self, claim: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(claim.into(), value.into());
        self
    }

    pub fn claim(&self, claim: &str) -> Option<&str> {
        self.claims.get(claim).map(String::as_str)
    }
}
