//! Secret redaction for rendering a namespace.

use crate::OverlayError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log::warn;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Key patterns redacted even when not explicitly marked secret.
const DEFAULT_SECRET_PATTERNS: &[&str] = &["*PASSWORD*", "*TOKEN*", "*SECRET*", "CONNECTION"];
/// Text substituted for redacted values.
const DEFAULT_REPLACEMENT: &str = "[REDACTED]";

/// Policy that hides secret values when a namespace is rendered.
#[derive(Debug, Clone)]
pub struct SecretPolicy {
    /// Case-insensitive glob patterns for secret key names.
    patterns: Vec<String>,
    matcher: GlobSet,
    /// Replacement text for redacted values.
    pub replacement: String,
}

impl Default for SecretPolicy {
    fn default() -> Self {
        let patterns: Vec<String> = DEFAULT_SECRET_PATTERNS
            .iter()
            .map(|pattern| pattern.to_string())
            .collect();
        let matcher = build_matcher(&patterns).unwrap_or_else(|err| {
            warn!("default secret patterns failed to compile: {err}");
            GlobSet::empty()
        });
        Self {
            patterns,
            matcher,
            replacement: DEFAULT_REPLACEMENT.to_string(),
        }
    }
}

impl SecretPolicy {
    /// Build a policy from explicit key patterns.
    pub fn with_patterns<I, S>(patterns: I) -> Result<Self, OverlayError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let matcher = build_matcher(&patterns)?;
        Ok(Self {
            patterns,
            matcher,
            replacement: DEFAULT_REPLACEMENT.to_string(),
        })
    }

    /// Patterns this policy matches keys against.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether a key name matches one of the secret patterns.
    pub fn matches_key(&self, key: &str) -> bool {
        self.matcher.is_match(key)
    }

    /// Render settings with explicit secrets and pattern matches replaced.
    pub(crate) fn redact(&self, values: &Map<String, Value>, secrets: &BTreeSet<String>) -> Value {
        let mut redacted = Map::with_capacity(values.len());
        for (key, value) in values {
            let value = if secrets.contains(key) || self.matches_key(key) {
                Value::String(self.replacement.clone())
            } else {
                self.redact_nested(value)
            };
            redacted.insert(key.clone(), value);
        }
        Value::Object(redacted)
    }

    fn redact_nested(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut redacted = Map::with_capacity(map.len());
                for (key, value) in map {
                    let value = if self.matches_key(key) {
                        Value::String(self.replacement.clone())
                    } else {
                        self.redact_nested(value)
                    };
                    redacted.insert(key.clone(), value);
                }
                Value::Object(redacted)
            }
            Value::Array(values) => {
                Value::Array(values.iter().map(|value| self.redact_nested(value)).collect())
            }
            value => value.clone(),
        }
    }
}

fn build_matcher(patterns: &[String]) -> Result<GlobSet, OverlayError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|err| OverlayError::InvalidField {
                path: "secret_patterns".to_string(),
                message: format!("invalid pattern {pattern}: {err}"),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|err| OverlayError::Invalid(err.to_string()))
}
