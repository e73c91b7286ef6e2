use serde::{Deserialize, Serialize};

use crate::codec::nullable;

/// Where a product was at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductLocationEntry {
    #[serde(deserialize_with = "nullable")]
    pub location: String,
    /// ISO-8601 timestamp, stored as given.
    #[serde(deserialize_with = "nullable")]
    pub arrival_date: String,
}

impl ProductLocationEntry {
    pub fn new(location: impl Into<String>, arrival_date: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            arrival_date: arrival_date.into(),
        }
    }
}

/// Current location plus the append-only chain of earlier ones, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductLocationData {
    #[serde(deserialize_with = "nullable")]
    pub current: ProductLocationEntry,
    #[serde(deserialize_with = "nullable")]
    pub previous: Vec<ProductLocationEntry>,
}

impl ProductLocationData {
    /// Move `current` to the end of `previous` and make `next` current.
    pub fn advance(&mut self, next: ProductLocationEntry) {
        let prior = std::mem::replace(&mut self.current, next);
        self.previous.push(prior);
    }

    /// Number of locations the product has left behind.
    pub fn history_len(&self) -> usize {
        self.previous.len()
    }
}
