//! Error types for namespace merging and overlay loading.

use crate::ValueKind;
use thiserror::Error;

/// Errors returned while loading overlays or applying them to a namespace.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// An operation targeted a setting whose value has an incompatible shape.
    #[error("type mismatch at {key}: expected {expected}, found {found}")]
    TypeKind {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },
    /// An operation needed a setting that has not been resolved yet.
    #[error("missing setting {key} (required by {required_by})")]
    MissingKey { key: String, required_by: String },
    /// Reading a layer file failed.
    #[error("failed to read overlay: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// Parsing a layer file failed.
    #[error("failed to parse overlay: {0}")]
    ParseFailed(#[from] json5::Error),
    /// Converting JSON values failed.
    #[error("failed to decode overlay: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// A specific field failed validation.
    #[error("invalid overlay at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// Generic validation failure.
    #[error("invalid overlay: {0}")]
    Invalid(String),
}

impl OverlayError {
    pub(crate) fn type_kind(key: &str, expected: ValueKind, found: ValueKind) -> Self {
        Self::TypeKind {
            key: key.to_string(),
            expected,
            found,
        }
    }

    pub(crate) fn missing(key: &str, required_by: &str) -> Self {
        Self::MissingKey {
            key: key.to_string(),
            required_by: required_by.to_string(),
        }
    }
}
