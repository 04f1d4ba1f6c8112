//! Layered overlay loader with locked settings.
//!
//! Discovers overlay layers (system/user/cwd/runtime), validates their schema,
//! applies them in precedence order on top of a base namespace, and honors
//! settings locked by a requirements layer.

mod layer_io;
mod merge;
mod schema;
mod utils;


use crate::{ApplyReport, Namespace, Overlay, OverlayError, OverlayOp};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default overlay filename picked up from the working directory.
const DEFAULT_OVERLAY_FILE: &str = "horizon-overlay.json5";
/// Default overlay directory under the user's home.
const DEFAULT_OVERLAY_DIR: &str = ".horizon-overlay";
/// Overlay filename inside the user and system directories.
const LAYER_OVERLAY_FILE: &str = "overlay.json5";

#[cfg(unix)]
/// Default system overlay path on Unix.
const SYSTEM_OVERLAY_PATH: &str = "/etc/horizon-overlay/overlay.json5";
#[cfg(unix)]
/// Default requirements path on Unix.
const SYSTEM_REQUIREMENTS_PATH: &str = "/etc/horizon-overlay/requirements.json5";

/// Merged namespace plus metadata about which layers were applied.
#[derive(Debug, Clone)]
pub struct LayeredNamespace {
    /// The merged namespace, still open for further overlays.
    pub namespace: Namespace,
    /// Metadata for each layer applied during load.
    pub layers: Vec<OverlayLayer>,
    /// Operation counts across every layer.
    pub report: ApplyReport,
}

/// Origin for a single layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayLayerSource {
    /// Locked settings that later layers cannot change.
    Requirements,
    /// Overlay supplied in code, applied right after the requirements.
    Builtin,
    /// System-wide overlay.
    System,
    /// User-specific overlay.
    User,
    /// Current working directory overlay.
    Cwd,
    /// Explicit overlays (highest precedence).
    Runtime,
}

/// Metadata about a loaded layer.
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    /// Layer origin (system, user, runtime, etc).
    pub source: OverlayLayerSource,
    /// Location on disk.
    pub path: Option<PathBuf>,
    /// Number of operations (or locked settings) in the layer.
    pub operations: usize,
}

/// Options controlling layer discovery.
#[derive(Debug, Clone)]
pub struct LayeredNamespaceOptions {
    /// Working directory used to find the cwd layer.
    pub cwd: PathBuf,
    /// Optional system overlay path (defaults to `/etc/horizon-overlay/overlay.json5` on Unix).
    pub system_overlay_path: Option<PathBuf>,
    /// Optional user overlay path (defaults to `~/.horizon-overlay/overlay.json5`).
    pub user_overlay_path: Option<PathBuf>,
    /// Optional requirements path holding locked settings.
    pub requirements_path: Option<PathBuf>,
    /// Whether `horizon-overlay.json5` in the cwd is considered.
    pub include_cwd: bool,
    /// Runtime overlay paths applied last, in order.
    pub runtime_paths: Vec<PathBuf>,
    /// In-code overlays applied after the requirements and before any file layer.
    pub builtin_overlays: Vec<Overlay>,
}

impl LayeredNamespaceOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_overlay_path: layer_io::default_system_overlay_path(),
            user_overlay_path: layer_io::default_user_overlay_path(),
            requirements_path: layer_io::default_requirements_path(),
            include_cwd: true,
            runtime_paths: Vec::new(),
            builtin_overlays: Vec::new(),
        }
    }

    /// Options that only apply explicitly provided layers.
    pub fn isolated(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_overlay_path: None,
            user_overlay_path: None,
            requirements_path: None,
            include_cwd: false,
            runtime_paths: Vec::new(),
            builtin_overlays: Vec::new(),
        }
    }

    /// Add a runtime overlay path that is applied after the discovered layers.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Add an in-code overlay that sees locked settings but precedes every file layer.
    pub fn with_builtin_overlay(mut self, overlay: Overlay) -> Self {
        self.builtin_overlays.push(overlay);
        self
    }

    /// Use an explicit requirements file.
    pub fn with_requirements_path(mut self, path: impl AsRef<Path>) -> Self {
        self.requirements_path = Some(path.as_ref().to_path_buf());
        self
    }
}

/// On-disk form of an overlay layer.
#[derive(Debug, Deserialize)]
struct OverlayFile {
    #[serde(default, rename = "$schema")]
    schema: Option<String>,
    #[serde(default)]
    operations: Vec<OverlayOp>,
}

impl Overlay {
    /// Load an overlay layer from a JSON5 file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, OverlayError> {
        let path = path.as_ref();
        info!("loading overlay from path: {}", path.display());
        let contents = fs::read_to_string(path)?;
        overlay_from_str(&contents, &path.display().to_string())
    }

    /// Load an overlay layer from JSON5 contents.
    pub fn load_from_str(contents: &str) -> Result<Self, OverlayError> {
        debug!("loading overlay from raw contents (len={})", contents.len());
        overlay_from_str(contents, "overlay")
    }
}

impl Namespace {
    /// Load a base namespace from a JSON5 file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, OverlayError> {
        let path = path.as_ref();
        info!("loading base namespace from path: {}", path.display());
        let contents = fs::read_to_string(path)?;
        namespace_from_str(&contents, &path.display().to_string())
    }

    /// Load a base namespace from JSON5 contents.
    pub fn load_from_str(contents: &str) -> Result<Self, OverlayError> {
        debug!("loading base namespace from raw contents (len={})", contents.len());
        namespace_from_str(contents, "base")
    }

    /// Apply the default layer stack on top of this namespace.
    pub fn load_layered(self, cwd: impl AsRef<Path>) -> Result<LayeredNamespace, OverlayError> {
        info!(
            "loading layered overlays with defaults (cwd={})",
            cwd.as_ref().display()
        );
        self.load_layered_with_options(LayeredNamespaceOptions::new(cwd))
    }

    /// Apply an explicit layer stack on top of this namespace.
    ///
    /// Layer precedence (low -> high): requirements (locked settings), builtin,
    /// system, user, cwd, runtime overlays. Locked settings are in place before
    /// any overlay runs, so derived values always read the locked inputs.
    pub fn load_layered_with_options(
        mut self,
        options: LayeredNamespaceOptions,
    ) -> Result<LayeredNamespace, OverlayError> {
        let cwd = utils::normalize_path(&options.cwd)?;
        debug!("normalized cwd for overlay load: {}", cwd.display());
        let mut layers = Vec::new();
        let mut report = ApplyReport::default();
        let mut seen_paths = HashSet::new();

        let requirements =
            layer_io::load_optional_requirements(options.requirements_path.as_deref())?;
        let locked = match requirements {
            Some(requirements) => {
                let locked = merge::apply_requirements(&mut self, &requirements.values);
                layers.push(requirements.meta);
                locked
            }
            None => Default::default(),
        };

        for overlay in &options.builtin_overlays {
            report.absorb(overlay.apply_with_locks(&mut self, &locked)?);
            debug!("applied builtin overlay (operations={})", overlay.len());
            layers.push(OverlayLayer {
                source: OverlayLayerSource::Builtin,
                path: None,
                operations: overlay.len(),
            });
        }

        let mut candidates = vec![
            (OverlayLayerSource::System, options.system_overlay_path.clone()),
            (OverlayLayerSource::User, options.user_overlay_path.clone()),
        ];
        if options.include_cwd {
            candidates.push((OverlayLayerSource::Cwd, Some(cwd.join(DEFAULT_OVERLAY_FILE))));
        }

        for (source, path) in candidates {
            let Some(path) = path else { continue };
            let unique = utils::unique_path(&path);
            if seen_paths.contains(&unique) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if let Some(layer) = layer_io::load_optional_layer(source, &path)? {
                report.absorb(layer.overlay.apply_with_locks(&mut self, &locked)?);
                debug!("applied {:?} layer", source);
                layers.push(layer.meta);
                seen_paths.insert(unique);
            }
        }

        for runtime_path in &options.runtime_paths {
            let unique = utils::unique_path(runtime_path);
            if seen_paths.contains(&unique) {
                debug!("skipping duplicate runtime layer (path={})", runtime_path.display());
                continue;
            }
            let layer = layer_io::load_required_layer(OverlayLayerSource::Runtime, runtime_path)?;
            report.absorb(layer.overlay.apply_with_locks(&mut self, &locked)?);
            debug!("applied runtime layer (path={})", runtime_path.display());
            layers.push(layer.meta);
            seen_paths.insert(unique);
        }

        info!(
            "layered overlays applied (layers={}, applied={}, skipped={})",
            layers.len(),
            report.applied,
            report.skipped
        );
        Ok(LayeredNamespace {
            namespace: self,
            layers,
            report,
        })
    }
}

fn overlay_from_str(contents: &str, label: &str) -> Result<Overlay, OverlayError> {
    let value: Value = json5::from_str(contents)?;
    schema::validate_overlay_schema(&value, label)?;
    let file: OverlayFile = serde_json::from_value(value)?;
    if let Some(schema) = file.schema.as_deref() {
        debug!("overlay declares schema (layer={label}, schema={schema})");
    }
    Ok(file.operations.into_iter().collect())
}

fn namespace_from_str(contents: &str, label: &str) -> Result<Namespace, OverlayError> {
    let value: Value = json5::from_str(contents)?;
    schema::validate_namespace_schema(&value, label)?;
    match value {
        Value::Object(map) => Ok(Namespace::from_map(map)),
        _ => Err(OverlayError::Invalid(format!("{label}: expected object"))),
    }
}
