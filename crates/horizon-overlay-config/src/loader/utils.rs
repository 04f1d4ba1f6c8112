//! Path helpers used to resolve the cwd layer and de-duplicate overlay layers.

use crate::OverlayError;
use std::path::{Path, PathBuf};

/// Resolve the working directory that the cwd overlay layer is looked up in.
///
/// A missing directory is kept as given; the cwd layer then simply isn't found.
pub(super) fn normalize_path(path: &Path) -> Result<PathBuf, OverlayError> {
    match path.canonicalize() {
        Ok(path) => Ok(path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(err) => Err(OverlayError::ReadFailed(err)),
    }
}

/// Key identifying an overlay file, so a layer reached through two paths is applied once.
pub(super) fn unique_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
