use serde::{Deserialize, Serialize};

use crate::{Metadata, Value};

/// Conjunction of metadata equality constraints.
///
/// A document matches when every `(key, value)` pair is present in its
/// metadata with an equal value. Documents missing a filtered key never
/// match. An empty filter matches everything.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MetadataFilter(Metadata);

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(key, value)
    }

    pub fn and(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.0
            .iter()
            .all(|(key, expected)| metadata.get(key).map_or(false, |actual| actual == expected))
    }
}

impl From<Metadata> for MetadataFilter {
    fn from(pairs: Metadata) -> Self {
        Self(pairs)
    }
}

impl<K, V> FromIterator<(K, V)> for MetadataFilter
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}
