//! Settings namespace, overlay operations, and layered overlay loading for a
//! Horizon-style dashboard.
//!
//! A base [`Namespace`] is merged with one or more [`Overlay`]s, then frozen
//! into read-only [`Settings`].

pub mod contrib;
mod error;
mod loader;
mod model;
mod overlay;
mod redact;

/// Public error type returned by overlay loading and merging.
pub use error::OverlayError;
/// Layered loader types and options.
pub use loader::{LayeredNamespace, LayeredNamespaceOptions, OverlayLayer, OverlayLayerSource};
/// Namespace model.
pub use model::{Namespace, Settings, ValueKind};
/// Overlay operations and derived-value builders.
pub use overlay::{
    ApplyReport, DatabaseUrl, Derivation, KEYSTONE_PATH, KEYSTONE_PORT, Overlay, OverlayOp,
    SecretValue, database_url, endpoint_url, join_path, keystone_url,
};
/// Secret redaction policy.
pub use redact::SecretPolicy;
