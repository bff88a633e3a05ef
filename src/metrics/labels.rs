//! Metric label sets.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// An unordered set of `name = value` labels.
///
/// Names are unique. Iteration, equality and hashing follow label-name order,
/// so two sets built in different orders identify the same series and render
/// identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build from a flat `[name, value, name, value, ...]` list.
    /// A trailing name without a value is ignored.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Self {
        pairs
            .chunks_exact(2)
            .map(|pair| (pair[0].as_ref(), pair[1].as_ref()))
            .collect()
    }

    /// Insert a label, returning the previous value for that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// Builder-style [`LabelSet::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add every label of `other` whose name is not already present.
    pub fn extend_missing(&mut self, other: &LabelSet) {
        for (name, value) in other.iter() {
            self.0
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Labels in the form the `metrics` crate keys series by.
    pub(crate) fn to_metric_labels(&self) -> Vec<metrics::Label> {
        self.0
            .iter()
            .map(|(k, v)| metrics::Label::new(k.clone(), v.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for LabelSet {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}={value:?}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_independent_identity() {
        let a = LabelSet::new().with("method", "GET").with("uri", "/x");
        let b = LabelSet::new().with("uri", "/x").with("method", "GET");

        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.to_string(), r#"{method="GET",uri="/x"}"#);
    }

    #[test]
    fn test_names_are_unique() {
        let mut labels = LabelSet::new().with("status", "200");
        assert_eq!(labels.insert("status", "404"), Some("200".to_string()));
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("status"), Some("404"));
    }

    #[test]
    fn test_from_pairs_ignores_trailing_name() {
        let labels = LabelSet::from_pairs(&["region", "us", "dangling"]);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("region"), Some("us"));
    }

    #[test]
    fn test_extend_missing_keeps_existing() {
        let mut labels = LabelSet::new().with("uri", "/x");
        labels.extend_missing(&LabelSet::new().with("uri", "/y").with("appName", "canals"));

        assert_eq!(labels.get("uri"), Some("/x"));
        assert_eq!(labels.get("appName"), Some("canals"));
    }
}
