//! Overlay operations and their application to a settings namespace.
//!
//! An overlay is an ordered list of operations. Operations run in order and
//! the first failure aborts the merge. Override operations are idempotent;
//! `extend` and `append` add entries unconditionally, so applying the same
//! overlay twice duplicates them.

mod derive;


pub use derive::{
    DatabaseUrl, Derivation, KEYSTONE_PATH, KEYSTONE_PORT, database_url, endpoint_url, join_path,
    keystone_url,
};

use crate::{Namespace, OverlayError, ValueKind};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Setting value that must not show up in logs or debug output.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretValue(Value);

impl SecretValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// Access the wrapped value.
    pub fn expose(&self) -> &Value {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue([REDACTED])")
    }
}

/// A single merge step applied to a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OverlayOp {
    /// Replace a setting, creating it when absent.
    Set { key: String, value: Value },
    /// Replace a setting and mark it secret.
    SetSecret { key: String, value: SecretValue },
    /// Replace one entry of a mapping setting.
    SetEntry {
        key: String,
        entry: String,
        value: Value,
    },
    /// Append several values to a sequence setting.
    Extend { key: String, values: Vec<Value> },
    /// Register one identifier at the end of a sequence setting.
    Append { key: String, value: Value },
    /// Drop one entry of a mapping setting.
    Remove { key: String, entry: String },
    /// Compute a setting from settings applied earlier.
    Derive {
        key: String,
        derivation: Derivation,
    },
}

impl OverlayOp {
    /// Top-level setting key the operation writes to.
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. }
            | Self::SetSecret { key, .. }
            | Self::SetEntry { key, .. }
            | Self::Extend { key, .. }
            | Self::Append { key, .. }
            | Self::Remove { key, .. }
            | Self::Derive { key, .. } => key,
        }
    }

    /// Operation name as written in overlay files.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::SetSecret { .. } => "set_secret",
            Self::SetEntry { .. } => "set_entry",
            Self::Extend { .. } => "extend",
            Self::Append { .. } => "append",
            Self::Remove { .. } => "remove",
            Self::Derive { .. } => "derive",
        }
    }

    fn describe(&self) -> String {
        format!("{} {}", self.kind(), self.key())
    }

    fn apply(&self, namespace: &mut Namespace) -> Result<(), OverlayError> {
        match self {
            Self::Set { key, value } => {
                namespace.insert(key.clone(), value.clone());
            }
            Self::SetSecret { key, value } => {
                namespace.insert_secret(key.clone(), value.expose().clone());
            }
            Self::SetEntry { key, entry, value } => {
                let required_by = self.describe();
                let existing = namespace
                    .get_mut(key)
                    .ok_or_else(|| OverlayError::missing(key, &required_by))?;
                let found = ValueKind::of(existing);
                let map = existing
                    .as_object_mut()
                    .ok_or_else(|| OverlayError::type_kind(key, ValueKind::Mapping, found))?;
                map.insert(entry.clone(), value.clone());
            }
            Self::Extend { key, values } => {
                sequence_mut(namespace, key, &self.describe())?.extend(values.iter().cloned());
            }
            Self::Append { key, value } => {
                sequence_mut(namespace, key, &self.describe())?.push(value.clone());
            }
            Self::Remove { key, entry } => {
                let Some(existing) = namespace.get_mut(key) else {
                    debug!("remove target absent; nothing to do (key={key})");
                    return Ok(());
                };
                let found = ValueKind::of(existing);
                let map = existing
                    .as_object_mut()
                    .ok_or_else(|| OverlayError::type_kind(key, ValueKind::Mapping, found))?;
                if map.remove(entry).is_none() {
                    debug!("remove entry absent; nothing to do (key={key}, entry={entry})");
                }
            }
            Self::Derive { key, derivation } => {
                let value = derivation.resolve(namespace, &self.describe())?;
                if derivation.is_secret() {
                    namespace.insert_secret(key.clone(), value);
                } else {
                    namespace.insert(key.clone(), value);
                }
            }
        }
        Ok(())
    }
}

fn sequence_mut<'a>(
    namespace: &'a mut Namespace,
    key: &str,
    required_by: &str,
) -> Result<&'a mut Vec<Value>, OverlayError> {
    let existing = namespace
        .get_mut(key)
        .ok_or_else(|| OverlayError::missing(key, required_by))?;
    let found = ValueKind::of(existing);
    existing
        .as_array_mut()
        .ok_or_else(|| OverlayError::type_kind(key, ValueKind::Sequence, found))
}

/// Counts of operations applied and skipped during a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Operations that ran against the namespace.
    pub applied: usize,
    /// Operations skipped because their key is locked.
    pub skipped: usize,
}

impl ApplyReport {
    /// Accumulate another report into this one.
    pub fn absorb(&mut self, other: ApplyReport) {
        self.applied += other.applied;
        self.skipped += other.skipped;
    }
}

/// Ordered list of overlay operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    #[serde(default)]
    operations: Vec<OverlayOp>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation at the end of the overlay.
    pub fn push(mut self, op: OverlayOp) -> Self {
        self.operations.push(op);
        self
    }

    /// Override a setting.
    pub fn set(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(OverlayOp::Set {
            key: key.into(),
            value: value.into(),
        })
    }

    /// Override a setting and mark it secret.
    pub fn set_secret(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(OverlayOp::SetSecret {
            key: key.into(),
            value: SecretValue::new(value),
        })
    }

    /// Override one entry of a mapping setting.
    pub fn set_entry(
        self,
        key: impl Into<String>,
        entry: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.push(OverlayOp::SetEntry {
            key: key.into(),
            entry: entry.into(),
            value: value.into(),
        })
    }

    /// Extend a sequence setting.
    pub fn extend<I, V>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(OverlayOp::Extend {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Register an identifier at the end of a sequence setting.
    pub fn append(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(OverlayOp::Append {
            key: key.into(),
            value: value.into(),
        })
    }

    /// Remove an entry from a mapping setting.
    pub fn remove(self, key: impl Into<String>, entry: impl Into<String>) -> Self {
        self.push(OverlayOp::Remove {
            key: key.into(),
            entry: entry.into(),
        })
    }

    /// Derive a setting from settings applied earlier.
    pub fn derive(self, key: impl Into<String>, derivation: Derivation) -> Self {
        self.push(OverlayOp::Derive {
            key: key.into(),
            derivation,
        })
    }

    /// Append every operation of another overlay.
    pub fn chain(mut self, other: Overlay) -> Self {
        self.operations.extend(other.operations);
        self
    }

    pub fn operations(&self) -> &[OverlayOp] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Apply every operation in order, stopping at the first error.
    pub fn apply(&self, namespace: &mut Namespace) -> Result<ApplyReport, OverlayError> {
        self.apply_with_locks(namespace, &BTreeSet::new())
    }

    /// Apply operations, skipping any that target a locked setting.
    ///
    /// Derive inputs are checked before the first operation runs, so an
    /// overlay that derives from a setting it writes later fails without
    /// touching the namespace.
    pub fn apply_with_locks(
        &self,
        namespace: &mut Namespace,
        locked: &BTreeSet<String>,
    ) -> Result<ApplyReport, OverlayError> {
        self.check_derive_order(namespace, locked)?;
        let mut report = ApplyReport::default();
        for op in &self.operations {
            if locked.contains(op.key()) {
                warn!(
                    "skipping overlay op on locked setting (op={}, key={})",
                    op.kind(),
                    op.key()
                );
                report.skipped += 1;
                continue;
            }
            op.apply(namespace)?;
            debug!("applied overlay op (op={}, key={})", op.kind(), op.key());
            report.applied += 1;
        }
        Ok(report)
    }

    fn check_derive_order(
        &self,
        namespace: &Namespace,
        locked: &BTreeSet<String>,
    ) -> Result<(), OverlayError> {
        let mut written: BTreeSet<&str> = BTreeSet::new();
        for op in &self.operations {
            if locked.contains(op.key()) {
                continue;
            }
            if let OverlayOp::Derive { derivation, .. } = op {
                if let Some(missing) = derivation
                    .dependencies()
                    .into_iter()
                    .find(|dep| !namespace.contains_key(dep) && !written.contains(dep))
                {
                    return Err(OverlayError::missing(missing, &op.describe()));
                }
            }
            if matches!(
                op,
                OverlayOp::Set { .. } | OverlayOp::SetSecret { .. } | OverlayOp::Derive { .. }
            ) {
                written.insert(op.key());
            }
        }
        Ok(())
    }
}

impl FromIterator<OverlayOp> for Overlay {
    fn from_iter<I: IntoIterator<Item = OverlayOp>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}
