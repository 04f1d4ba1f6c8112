//! Settings namespace model.

use crate::SecretPolicy;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Shape of a setting value, used when reporting type mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Sequence,
    Mapping,
}

impl ValueKind {
    /// Classify a JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Sequence,
            Value::Object(_) => Self::Mapping,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
        };
        f.write_str(name)
    }
}

/// Mutable settings namespace built during the overlay-merge phase.
///
/// Values are never exposed through `Debug` without redaction; use
/// [`Namespace::to_redacted_value`] to render the namespace for output.
#[derive(Clone, Default, PartialEq)]
pub struct Namespace {
    values: Map<String, Value>,
    secrets: BTreeSet<String>,
}

impl Namespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a namespace seeded from an existing mapping.
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self {
            values,
            secrets: BTreeSet::new(),
        }
    }

    /// Look up a setting.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.values.get_mut(key)
    }

    /// Whether a setting is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of settings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Setting keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Replace a setting, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Replace a setting and mark it secret.
    pub fn insert_secret(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        self.secrets.insert(key.clone());
        self.values.insert(key, value)
    }

    /// Mark an existing or future setting as secret.
    pub fn mark_secret(&mut self, key: impl Into<String>) {
        self.secrets.insert(key.into());
    }

    /// Whether the key was explicitly marked secret.
    pub fn is_secret(&self, key: &str) -> bool {
        self.secrets.contains(key)
    }

    /// Render the namespace as JSON with secret values replaced.
    pub fn to_redacted_value(&self, policy: &SecretPolicy) -> Value {
        policy.redact(&self.values, &self.secrets)
    }

    /// Finish the merge phase and return a read-only view.
    pub fn freeze(self) -> Settings {
        Settings { inner: self }
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("values", &self.to_redacted_value(&SecretPolicy::default()))
            .field("secrets", &self.secrets)
            .finish()
    }
}

impl FromIterator<(String, Value)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

/// Read-only settings produced once every overlay has been applied.
#[derive(Clone, PartialEq)]
pub struct Settings {
    inner: Namespace,
}

impl Settings {
    /// Look up a setting.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Look up a string setting.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Look up a boolean setting.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Look up an integer setting.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Look up a sequence setting.
    pub fn get_sequence(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key).and_then(Value::as_array)
    }

    /// Look up a mapping setting.
    pub fn get_mapping(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys()
    }

    /// Whether the key was explicitly marked secret.
    pub fn is_secret(&self, key: &str) -> bool {
        self.inner.is_secret(key)
    }

    /// Render the settings as JSON with secret values replaced.
    pub fn to_redacted_value(&self, policy: &SecretPolicy) -> Value {
        self.inner.to_redacted_value(policy)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Settings").field(&self.inner).finish()
    }
}
