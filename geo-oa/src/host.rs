// Host integration module
// Capability trait for the host platform, file lookup, and the client that queues UI actions

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::actions::{ActionQueue, ArtifactKind, HostAction, LayerKind};
use crate::chart::RatioChart;
use crate::config::GeoOaConfig;
use crate::error::{GeoOaError, Result};
use crate::export_csv::{csv_filename, export_csv, Record};
use crate::report::ReportBlock;

/// File currently selected in the host UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveFile {
    pub name: String,
    pub virtual_path: Option<String>,
}

/// Metadata attached to a registered artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub format: String,
    pub filename: String,
    pub description: String,
}

/// Capabilities the host platform provides
#[async_trait]
pub trait HostPlatform: Send + Sync {
    /// Files visible in the current project
    fn list_files(&self) -> Result<Vec<String>>;

    /// Currently selected file, if any
    fn active_file(&self) -> Option<ActiveFile>;

    /// Persist a session file into the project; returns the saved location
    fn save_file(&self, filename: &str) -> Result<String>;

    /// Make a written file visible to the user as an artifact
    fn register_artifact(&self, path: &Path, metadata: &ArtifactMetadata) -> Result<()>;

    /// Install a package into the host environment
    async fn install_package(&self, package_name: &str) -> Result<()>;
}

/// Failure values returned by the layer and plot helpers
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("Error: Raster data must be Image or path.")]
    RasterData,
    #[error("Error: Vector data must be shapes or path.")]
    VectorData,
    #[error("Error saving: {0}")]
    Save(String),
}

/// Reply from a helper that queues an action
pub type ActionReply = std::result::Result<String, ActionError>;

/// Layer payload, resolved by the caller before queueing
#[derive(Debug, Clone)]
pub enum LayerData {
    /// Raster image to be written into the session directory
    Image(RgbImage),
    /// Existing file path
    Path(String),
    /// Vector shapes passed through to the host
    Shapes(Vec<Value>),
}

impl LayerData {
    /// Layer kind used when the caller does not name one
    pub fn default_kind(&self) -> LayerKind {
        match self {
            LayerData::Image(_) => LayerKind::Raster,
            LayerData::Path(_) | LayerData::Shapes(_) => LayerKind::Vector,
        }
    }
}

/// Plot payload for `add_related_plot`
#[derive(Debug, Clone)]
pub enum PlotData {
    Chart(RatioChart),
    Image(RgbImage),
}

/// Metrics record returned to the tool wrapper
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub target_file: String,
    pub metrics: Map<String, Value>,
}

/// Resolves filenames against an ordered list of directories
#[derive(Debug, Clone)]
pub struct FileStore {
    search_dirs: Vec<PathBuf>,
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(search_dirs: Vec<PathBuf>, data_dir: PathBuf) -> Self {
        Self {
            search_dirs,
            data_dir,
        }
    }

    pub fn from_config(config: &GeoOaConfig) -> Self {
        Self::new(config.effective_search_dirs(), config.data_dir.clone())
    }

    /// Find a file: as given, then in each search dir, then anywhere under the data dir
    pub fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let direct = PathBuf::from(filename);
        if direct.is_file() {
            return Ok(direct);
        }

        let relative = filename.trim_start_matches('/');
        for dir in &self.search_dirs {
            let candidate = dir.join(relative);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        let base = Path::new(relative)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        if let Some(found) = find_recursive(&self.data_dir, &base) {
            return Ok(found);
        }

        Err(GeoOaError::NotFound(format!("Could not find {}", filename)))
    }

    pub fn load_image(&self, filename: &str) -> Result<DynamicImage> {
        let path = self.resolve(filename)?;
        log::debug!("Loading image {}", path.display());
        Ok(image::open(&path)?)
    }
}

/// Whether an entry is a real directory to descend into; symlinked dirs are not
fn is_walkable_dir(entry: &fs::DirEntry) -> bool {
    entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
}

/// Depth-first search for a file name
///
/// Unreadable directories are skipped and symlinked directories are never
/// followed.
fn find_recursive(dir: &Path, name: &std::ffi::OsStr) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if is_walkable_dir(&entry) {
            subdirs.push(path);
        } else if path.is_dir() {
            continue;
        } else if entry.file_name() == name {
            return Some(path);
        }
    }

    subdirs.sort();
    subdirs.iter().find_map(|d| find_recursive(d, name))
}

/// Keep alphanumerics, space, '-' and '_'; trim; spaces become underscores
pub fn safe_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim().replace(' ', "_")
}

/// Six random lowercase letters/digits for unique session file names
fn random_suffix() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Shared host SDK client: file access, action queueing and delegation to the host
pub struct HostClient<H: HostPlatform> {
    host: H,
    store: FileStore,
    session_dir: PathBuf,
    queue: ActionQueue,
}

impl<H: HostPlatform> HostClient<H> {
    pub fn new(host: H, config: &GeoOaConfig) -> Self {
        Self {
            host,
            store: FileStore::from_config(config),
            session_dir: config.session_dir.clone(),
            queue: ActionQueue::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    /// Hand every queued action to the caller
    pub fn take_actions(&mut self) -> Vec<HostAction> {
        self.queue.drain()
    }

    pub fn list_files(&self) -> Result<Vec<String>> {
        self.host.list_files()
    }

    pub fn load_image(&self, filename: &str) -> Result<DynamicImage> {
        self.store.load_image(filename)
    }

    /// Load the image currently selected in the host
    pub fn get_active_image(&self) -> Result<DynamicImage> {
        let active = self
            .host
            .active_file()
            .ok_or_else(|| GeoOaError::NotFound("No active file selected.".to_string()))?;
        match active.virtual_path {
            Some(path) => self.load_image(&path),
            None => Err(GeoOaError::NotFound("Active file not found.".to_string())),
        }
    }

    fn session_file(&self, prefix: &str, name: &str, extension: &str) -> PathBuf {
        let fname = format!("{}_{}_{}.{}", prefix, safe_name(name), random_suffix(), extension);
        self.session_dir.join(fname)
    }

    /// Queue creation of a layer
    ///
    /// Without an explicit kind, images become RASTER layers and everything else VECTOR.
    pub fn add_layer(
        &mut self,
        name: &str,
        kind: Option<LayerKind>,
        data: LayerData,
        target_file: Option<&str>,
        style: Map<String, Value>,
    ) -> ActionReply {
        let kind = kind.unwrap_or_else(|| data.default_kind());

        let source = match (kind, data) {
            (LayerKind::Raster, LayerData::Image(img)) => {
                let path = self.session_file("layer", name, "png");
                img.save(&path)
                    .map_err(|e| ActionError::Save(e.to_string()))?;
                Value::from(path.to_string_lossy().into_owned())
            }
            (LayerKind::Raster, LayerData::Path(path)) => Value::from(path),
            (LayerKind::Raster, LayerData::Shapes(_)) => return Err(ActionError::RasterData),
            (LayerKind::Vector, LayerData::Shapes(shapes)) => Value::Array(shapes),
            (LayerKind::Vector, LayerData::Path(path)) => Value::from(path),
            (LayerKind::Vector, LayerData::Image(_)) => return Err(ActionError::VectorData),
        };

        self.queue.push(HostAction::AddLayer {
            target_file: target_file.map(str::to_string),
            name: name.to_string(),
            layer_type: kind,
            style,
            source,
        });

        log::info!("Queued {} layer '{}'", kind, name);
        Ok(format!("Queueing creation of {} layer '{}'.", kind, name))
    }

    pub fn add_image_layer(&mut self, name: &str, data: LayerData, style: Map<String, Value>) -> ActionReply {
        self.add_layer(name, Some(LayerKind::Raster), data, None, style)
    }

    pub fn add_annotation_layer(&mut self, name: &str, data: LayerData, style: Map<String, Value>) -> ActionReply {
        self.add_layer(name, Some(LayerKind::Vector), data, None, style)
    }

    /// Save a plot into the session directory and attach it to a file
    pub fn add_related_plot(&mut self, name: &str, data: PlotData, target_file: Option<&str>) -> ActionReply {
        let path = match &data {
            PlotData::Chart(chart) => {
                let path = self.session_file("artifact", name, "svg");
                chart
                    .save(&path)
                    .map_err(|e| ActionError::Save(e.to_string()))?;
                path
            }
            PlotData::Image(img) => {
                let path = self.session_file("artifact", name, "png");
                img.save(&path)
                    .map_err(|e| ActionError::Save(e.to_string()))?;
                path
            }
        };

        self.queue.push(HostAction::AttachArtifact {
            target_file: target_file.map(str::to_string),
            name: name.to_string(),
            artifact_type: ArtifactKind::Plot,
            source: path.to_string_lossy().into_owned(),
        });

        log::info!("Queued plot artifact '{}'", name);
        Ok(format!("Attached plot '{}'.", name))
    }

    /// Queue report blocks for display alongside a layer
    pub fn report_layer_data(
        &mut self,
        layer_name: &str,
        blocks: Vec<ReportBlock>,
        target_file: Option<&str>,
    ) -> String {
        self.queue.push(HostAction::UpdateLayerData {
            target_file: target_file.map(str::to_string),
            layer_name: layer_name.to_string(),
            blocks,
        });
        format!("Updated data blocks for layer '{}'.", layer_name)
    }

    /// Wrap metrics for the tool wrapper; nothing is queued
    pub fn update_metrics(&self, target_file: &str, metrics: Map<String, Value>) -> AnalysisResult {
        AnalysisResult {
            kind: "analysis_result",
            target_file: target_file.to_string(),
            metrics,
        }
    }

    pub fn save_to_project(&self, filename: &str) -> Result<String> {
        self.host.save_file(filename)
    }

    /// Write records to a CSV in the session directory and register it as an artifact
    pub fn export_csv(&self, records: &[Record], filename: &str) -> Result<Option<PathBuf>> {
        let Some(path) = export_csv(records, filename, &self.session_dir)? else {
            return Ok(None);
        };

        let metadata = ArtifactMetadata {
            format: "csv".to_string(),
            filename: csv_filename(filename),
            description: "OA Measurements Export".to_string(),
        };
        self.host.register_artifact(&path, &metadata)?;
        Ok(Some(path))
    }

    /// Install a package through the host; the host's failure propagates
    pub async fn install_package(&self, package_name: &str) -> Result<()> {
        log::info!("Installing package {}", package_name);
        self.host.install_package(package_name).await
    }
}

/// Filesystem-backed host used by the command line tool
pub struct LocalHost {
    session_dir: PathBuf,
    data_dir: PathBuf,
    active_file: Option<String>,
    artifacts: Mutex<Vec<(PathBuf, ArtifactMetadata)>>,
}

impl LocalHost {
    pub fn new(config: &GeoOaConfig) -> Self {
        Self {
            session_dir: config.session_dir.clone(),
            data_dir: config.data_dir.clone(),
            active_file: config.active_file.clone(),
            artifacts: Mutex::new(Vec::new()),
        }
    }

    fn registry(&self) -> Result<MutexGuard<'_, Vec<(PathBuf, ArtifactMetadata)>>> {
        self.artifacts
            .lock()
            .map_err(|_| GeoOaError::Host("artifact registry poisoned".to_string()))
    }

    /// Artifacts registered so far
    pub fn artifacts(&self) -> Result<Vec<(PathBuf, ArtifactMetadata)>> {
        Ok(self.registry()?.clone())
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if is_walkable_dir(&entry) {
            collect_files(root, &path, out)?;
        } else if path.is_dir() {
            continue;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().into_owned());
        }
    }
    Ok(())
}

#[async_trait]
impl HostPlatform for LocalHost {
    fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        if self.data_dir.is_dir() {
            collect_files(&self.data_dir, &self.data_dir, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    fn active_file(&self) -> Option<ActiveFile> {
        self.active_file.as_ref().map(|path| ActiveFile {
            name: Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.clone()),
            virtual_path: Some(path.clone()),
        })
    }

    fn save_file(&self, filename: &str) -> Result<String> {
        let src = self.session_dir.join(filename);
        if !src.is_file() {
            return Err(GeoOaError::NotFound(format!("Could not find {}", filename)));
        }
        fs::create_dir_all(&self.data_dir)?;
        let dst = self.data_dir.join(filename);
        fs::copy(&src, &dst)?;
        Ok(dst.to_string_lossy().into_owned())
    }

    fn register_artifact(&self, path: &Path, metadata: &ArtifactMetadata) -> Result<()> {
        log::info!("Artifact {} ({}): {}", metadata.filename, metadata.format, path.display());
        self.registry()?.push((path.to_path_buf(), metadata.clone()));
        Ok(())
    }

    async fn install_package(&self, package_name: &str) -> Result<()> {
        Err(GeoOaError::Host(format!(
            "Package installation is not available on the local host ({})",
            package_name
        )))
    }
}
