pub type Value = serde_json::Value;

/// Insertion-ordered metadata attached to a [`crate::Document`].
pub type Metadata = serde_json::Map<String, Value>;

/// Builds a [`Metadata`] map from `(key, value)` pairs, keeping the given order.
pub fn metadata<I, K, V>(pairs: I) -> Metadata
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}
