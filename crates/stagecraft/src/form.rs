//! Submitted field maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The value submitted for one field: a single string, or every value in
/// submission order when the field was sent more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    Sequence(Vec<String>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            FieldValue::Sequence(_) => None,
        }
    }

    /// All values, in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Scalar(s) => vec![s.as_str()],
            FieldValue::Sequence(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// One form submission: field name to one or more string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Submission {
    fields: BTreeMap<String, Vec<String>>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs; repeated keys accumulate in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut submission = Self::new();
        for (key, value) in pairs {
            submission.insert(key, value);
        }
        submission
    }

    /// Append a value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(key.into()).or_default().push(value.into());
    }

    /// Builder-style [`Submission::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value for `key`: a sequence when more than one value was sent,
    /// otherwise a scalar.
    pub fn get(&self, key: &str) -> Option<FieldValue> {
        match self.fields.get(key).map(Vec::as_slice) {
            None | Some([]) => None,
            Some([single]) => Some(FieldValue::Scalar(single.clone())),
            Some(many) => Some(FieldValue::Sequence(many.to_vec())),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Submission {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
