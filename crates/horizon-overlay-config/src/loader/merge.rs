//! Locked-setting handling for the requirements layer.

use crate::Namespace;
use log::debug;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Write every required setting into the namespace and return the locked keys.
///
/// Required settings replace base values outright; overlay layers applied
/// afterwards skip any operation on these keys.
pub(super) fn apply_requirements(
    namespace: &mut Namespace,
    requirements: &Map<String, Value>,
) -> BTreeSet<String> {
    let mut locked = BTreeSet::new();
    for (key, value) in requirements {
        namespace.insert(key.clone(), value.clone());
        debug!("locked setting (key={key})");
        locked.insert(key.clone());
    }
    locked
}
