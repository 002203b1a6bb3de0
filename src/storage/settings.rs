//! Active-collection hand-off between indexing passes.
//!
//! Two vector store collections alternate. A rebuild loads the one that is
//! not active and then records it as active, so queries keep reading a
//! complete collection while the other one is being rebuilt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contents of the `settings` blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSettings {
    /// Collection queries read from
    #[serde(default)]
    pub active_collection: Option<String>,

    /// When the active collection last changed
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CollectionSettings {
    /// Make `collection` the active one.
    pub fn activate(&mut self, collection: &str) {
        self.active_collection = Some(collection.to_string());
        self.updated_at = Some(Utc::now());
    }
}

/// The two alternating collection names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPair {
    first: String,
    second: String,
}

impl CollectionPair {
    pub fn new(prefix: &str) -> Self {
        Self {
            first: format!("{prefix}_a"),
            second: format!("{prefix}_b"),
        }
    }

    /// Collection the next rebuild should write to.
    pub fn standby(&self, settings: &CollectionSettings) -> &str {
        match settings.active_collection.as_deref() {
            Some(active) if active == self.first => &self.second,
            _ => &self.first,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standby_alternates() {
        let pair = CollectionPair::new("chunks");
        let mut settings = CollectionSettings::default();
        assert_eq!(pair.standby(&settings), "chunks_a");

        settings.activate("chunks_a");
        assert_eq!(pair.standby(&settings), "chunks_b");
        assert!(settings.updated_at.is_some());

        settings.activate("chunks_b");
        assert_eq!(pair.standby(&settings), "chunks_a");
    }

    #[test]
    fn test_unknown_active_collection_falls_back() {
        let pair = CollectionPair::new("chunks");
        let settings = CollectionSettings {
            active_collection: Some("legacy".to_string()),
            updated_at: None,
        };
        assert_eq!(pair.standby(&settings), "chunks_a");
    }
}
