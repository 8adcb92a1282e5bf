//! Named analysis results: a JSON-serializable mapping of result name to value.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single named result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    /// A scalar (threshold, count, location...).
    Scalar(f64),
    /// Sample positions.
    Indices(Vec<usize>),
    /// A per-sample array (scores, values).
    Array(Vec<f64>),
    /// A label such as an algorithm name.
    Text(String),
}

impl From<f64> for ResultValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<Vec<f64>> for ResultValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Array(v)
    }
}

impl From<Vec<usize>> for ResultValue {
    fn from(v: Vec<usize>) -> Self {
        Self::Indices(v)
    }
}

impl From<&str> for ResultValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Mapping of result name to value, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamedResults(BTreeMap<String, ResultValue>);

impl NamedResults {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, replacing any previous value under the same name.
    pub fn insert(&mut self, name: &str, value: impl Into<ResultValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<ResultValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a result by name.
    pub fn get(&self, name: &str) -> Option<&ResultValue> {
        self.0.get(name)
    }

    /// Number of results.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResultValue)> {
        self.0.iter()
    }

    /// Merge another mapping into this one; entries in `other` win.
    pub fn extend(&mut self, other: NamedResults) {
        self.0.extend(other.0);
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_results_json() {
        let results = NamedResults::new()
            .with("algorithm", "gg_1spike")
            .with("threshold", 12.0)
            .with("indices", vec![3usize, 7]);

        let json = results.to_json().unwrap();
        assert!(json.contains("\"algorithm\": \"gg_1spike\""));

        let parsed = NamedResults::from_json(&json).unwrap();
        assert_eq!(parsed.get("threshold"), Some(&ResultValue::Scalar(12.0)));
        assert_eq!(parsed.get("indices"), Some(&ResultValue::Indices(vec![3, 7])));
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_extend_overwrites() {
        let mut a = NamedResults::new().with("n", 1.0);
        a.extend(NamedResults::new().with("n", 2.0).with("m", 3.0));
        assert_eq!(a.get("n"), Some(&ResultValue::Scalar(2.0)));
        assert_eq!(a.len(), 2);
    }
}
