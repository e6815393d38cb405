//! Cache key declarations owned by cache nodes.

use serde::{Deserialize, Serialize};

use crate::ids::KeyId;

/// Value structure stored under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    #[default]
    String,
    Hash,
    List,
    Set,
    SortedSet,
    Stream,
}

/// A key pattern such as `user:{id}:profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    pub id: KeyId,
    pub pattern: String,
    #[serde(default)]
    pub value_type: ValueType,
    /// Time to live in seconds. `None` never expires.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
    /// Declared number of distinct keys, overriding the pattern estimate.
    #[serde(default)]
    pub estimated_cardinality: Option<u64>,
}

impl CacheKey {
    /// Creates a string key that never expires.
    pub fn new(id: impl Into<KeyId>, pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            value_type: ValueType::String,
            ttl_seconds: None,
            estimated_cardinality: None,
        }
    }

    /// Sets the TTL in seconds.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }

    /// Declares the number of distinct keys.
    pub fn with_cardinality(mut self, cardinality: u64) -> Self {
        self.estimated_cardinality = Some(cardinality);
        self
    }
}
