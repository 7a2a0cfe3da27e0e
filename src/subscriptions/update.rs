//! Update payloads and query parameters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What happened to the data behind a subscription.
///
/// Travels on the wire as its numeric value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum UpdateKind {
    /// A single item changed, either the item itself or one member of a list.
    ItemUpdate = 1,
    /// An item was added to a list.
    ItemAdd = 2,
    /// An item was removed from a list.
    ItemDelete = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown update kind {0}")]
pub struct UnknownUpdateKind(pub u8);

impl From<UpdateKind> for u8 {
    fn from(kind: UpdateKind) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for UpdateKind {
    type Error = UnknownUpdateKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(UpdateKind::ItemUpdate),
            2 => Ok(UpdateKind::ItemAdd),
            3 => Ok(UpdateKind::ItemDelete),
            other => Err(UnknownUpdateKind(other)),
        }
    }
}

/// Opaque payload plus its update kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub data: Value,
    pub kind: UpdateKind,
}

impl Update {
    pub fn new(data: Value, kind: UpdateKind) -> Self {
        Self { data, kind }
    }

    pub fn item_update(data: Value) -> Self {
        Self::new(data, UpdateKind::ItemUpdate)
    }

    pub fn item_add(data: Value) -> Self {
        Self::new(data, UpdateKind::ItemAdd)
    }

    pub fn item_delete(data: Value) -> Self {
        Self::new(data, UpdateKind::ItemDelete)
    }
}

/// Envelope handed to a transport for one subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub subscription: String,
    pub data: Update,
}

impl Message {
    pub fn new(subscription: impl Into<String>, data: Update) -> Self {
        Self {
            subscription: subscription.into(),
            data,
        }
    }
}

/// Extra key/value parameters supplied alongside a subscription path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    pairs: Vec<(String, String)>,
}

impl QueryParameters {
    /// Parse an `application/x-www-form-urlencoded` query string.
    /// A leading `?` is ignored.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// First value supplied for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
