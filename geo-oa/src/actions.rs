// Host action module
// Pending UI actions queued for the host platform to apply

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::report::ReportBlock;

/// Layer type understood by the host renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LayerKind {
    Raster,
    Vector,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Raster => write!(f, "RASTER"),
            LayerKind::Vector => write!(f, "VECTOR"),
        }
    }
}

/// Artifact type attached alongside a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArtifactKind {
    Plot,
}

/// A pending UI action, serialized with a `type` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostAction {
    AddLayer {
        target_file: Option<String>,
        name: String,
        layer_type: LayerKind,
        style: Map<String, Value>,
        /// Session path for raster layers, shape list or path for vector layers
        source: Value,
    },
    AttachArtifact {
        target_file: Option<String>,
        name: String,
        artifact_type: ArtifactKind,
        source: String,
    },
    UpdateLayerData {
        target_file: Option<String>,
        layer_name: String,
        blocks: Vec<ReportBlock>,
    },
}

/// Append-only queue of actions; the host drains it
#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: Vec<HostAction>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: HostAction) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Take every pending action, leaving the queue empty
    pub fn drain(&mut self) -> Vec<HostAction> {
        std::mem::take(&mut self.actions)
    }

    /// Pending actions as a JSON array, for hosts that consume JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.actions)
    }
}
