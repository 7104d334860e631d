//! Static topic → interface mapping.

use std::collections::{BTreeMap, HashMap};

use herald_core::TopicName;

/// Which interface each topic's publisher implements.
///
/// Loaded from the `[topics]` config section. Lets producers publish by
/// topic name alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicCatalog {
    entries: HashMap<TopicName, String>,
}

impl TopicCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a topic's interface.
    pub fn insert(&mut self, topic: impl Into<TopicName>, type_id: impl Into<String>) {
        self.entries.insert(topic.into(), type_id.into());
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, topic: impl Into<TopicName>, type_id: impl Into<String>) -> Self {
        self.insert(topic, type_id);
        self
    }

    /// Interface type id for `topic`.
    #[must_use]
    pub fn interface_for(&self, topic: &TopicName) -> Option<&str> {
        self.entries.get(topic).map(String::as_str)
    }

    /// Number of topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&BTreeMap<String, String>> for TopicCatalog {
    fn from(topics: &BTreeMap<String, String>) -> Self {
        topics
            .iter()
            .fold(Self::new(), |catalog, (topic, type_id)| {
                catalog.with(topic.as_str(), type_id.as_str())
            })
    }
}
