//! IO helpers for reading overlay layers from disk.

use super::{
    DEFAULT_OVERLAY_DIR, LAYER_OVERLAY_FILE, OverlayLayer, OverlayLayerSource,
    overlay_from_str, schema,
};
#[cfg(unix)]
use super::{SYSTEM_OVERLAY_PATH, SYSTEM_REQUIREMENTS_PATH};
use crate::{Overlay, OverlayError};
use directories::UserDirs;
use log::debug;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Overlay layer read from disk.
pub(super) struct LoadedLayer {
    pub(super) meta: OverlayLayer,
    pub(super) overlay: Overlay,
}

/// Requirements layer read from disk.
pub(super) struct LoadedRequirements {
    pub(super) meta: OverlayLayer,
    pub(super) values: Map<String, Value>,
}

/// Load an optional overlay layer if the provided path exists.
pub(super) fn load_optional_layer(
    source: OverlayLayerSource,
    path: &Path,
) -> Result<Option<LoadedLayer>, OverlayError> {
    if !path.exists() {
        debug!(
            "optional layer missing (source={:?}, path={})",
            source,
            path.display()
        );
        return Ok(None);
    }
    Ok(Some(load_required_layer(source, path)?))
}

/// Load and validate a required overlay layer from disk.
pub(super) fn load_required_layer(
    source: OverlayLayerSource,
    path: &Path,
) -> Result<LoadedLayer, OverlayError> {
    debug!(
        "loading overlay layer (source={:?}, path={})",
        source,
        path.display()
    );
    let contents = fs::read_to_string(path)?;
    let overlay = overlay_from_str(&contents, &layer_label(source, path))?;
    Ok(LoadedLayer {
        meta: OverlayLayer {
            source,
            path: Some(path.to_path_buf()),
            operations: overlay.len(),
        },
        overlay,
    })
}

/// Load the requirements layer if configured and present.
pub(super) fn load_optional_requirements(
    path: Option<&Path>,
) -> Result<Option<LoadedRequirements>, OverlayError> {
    let path = match path {
        Some(path) => path,
        None => return Ok(None),
    };
    if !path.exists() {
        debug!("requirements layer missing (path={})", path.display());
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let value: Value = json5::from_str(&contents)?;
    let label = layer_label(OverlayLayerSource::Requirements, path);
    schema::validate_namespace_schema(&value, &label)?;
    let values = match value {
        Value::Object(map) => map,
        _ => return Err(OverlayError::Invalid(format!("{label}: expected object"))),
    };
    Ok(Some(LoadedRequirements {
        meta: OverlayLayer {
            source: OverlayLayerSource::Requirements,
            path: Some(path.to_path_buf()),
            operations: values.len(),
        },
        values,
    }))
}

/// Build a user-friendly label for schema validation errors.
pub(super) fn layer_label(source: OverlayLayerSource, path: &Path) -> String {
    let name = match source {
        OverlayLayerSource::Requirements => "requirements",
        OverlayLayerSource::Builtin => "builtin",
        OverlayLayerSource::System => "system",
        OverlayLayerSource::User => "user",
        OverlayLayerSource::Cwd => "cwd",
        OverlayLayerSource::Runtime => "runtime",
    };
    format!("{name}({})", path.display())
}

/// Default system overlay path on Unix; None elsewhere.
pub(super) fn default_system_overlay_path() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        Some(PathBuf::from(SYSTEM_OVERLAY_PATH))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Default requirements path on Unix; None elsewhere.
pub(super) fn default_requirements_path() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        Some(PathBuf::from(SYSTEM_REQUIREMENTS_PATH))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Default user overlay path under the home directory.
pub(super) fn default_user_overlay_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_OVERLAY_DIR)
            .join(LAYER_OVERLAY_FILE)
    })
}
