//! Configuration for geo-oa.

use std::fs;
use std::path::{Path, PathBuf};

use geo_oa_common::DEFAULT_VOXEL_SIZE_MM;
use serde::{Deserialize, Serialize};

use crate::error::{GeoOaError, Result};

/// Runtime configuration, loadable from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoOaConfig {
    /// Physical size of one pixel in millimeters
    pub voxel_size_mm: f64,
    /// Writable session directory for layers, artifacts and exports
    pub session_dir: PathBuf,
    /// Root of the project data tree, walked as a last resort when loading images
    pub data_dir: PathBuf,
    /// Directories tried in order when a filename is not found as given.
    /// Empty means `[session_dir, data_dir]`.
    pub search_dirs: Vec<PathBuf>,
    /// TTF font used for overlay labels; labels are skipped without one
    pub font_path: Option<PathBuf>,
    /// Measurement line thickness in pixels
    pub line_width: u32,
    /// Virtual path of the file treated as active by the local host
    pub active_file: Option<String>,
}

impl Default for GeoOaConfig {
    fn default() -> Self {
        Self {
            voxel_size_mm: DEFAULT_VOXEL_SIZE_MM,
            session_dir: PathBuf::from("/.session"),
            data_dir: PathBuf::from("/workspace/data"),
            search_dirs: Vec::new(),
            font_path: None,
            line_width: 2,
            active_file: None,
        }
    }
}

impl GeoOaConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GeoOaError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| GeoOaError::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.voxel_size_mm.is_nan() || self.voxel_size_mm <= 0.0 {
            return Err(GeoOaError::Config(format!(
                "voxel_size_mm must be > 0, got {}",
                self.voxel_size_mm
            )));
        }
        if self.line_width == 0 {
            return Err(GeoOaError::Config("line_width must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Ordered directories searched for a bare filename
    pub fn effective_search_dirs(&self) -> Vec<PathBuf> {
        if self.search_dirs.is_empty() {
            vec![self.session_dir.clone(), self.data_dir.clone()]
        } else {
            self.search_dirs.clone()
        }
    }
}
