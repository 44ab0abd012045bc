//! Workspace configuration (`boxlabel.yaml`).
//!
//! Every field has a default, so the file is optional and may list only the
//! settings that differ.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BoxlabelError;

/// File name of the configuration inside a workspace.
pub const CONFIG_FILE: &str = "boxlabel.yaml";

/// Default class colors, cycled by class id.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF", "#FFA500", "#800080",
    "#008000", "#000080",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Image directory, relative to the workspace root.
    pub uploads_dir: String,
    /// Label directory, relative to the workspace root.
    pub annotations_dir: String,
    /// Directory holding detector outputs, relative to the workspace root.
    pub models_dir: String,
    /// Accepted image extensions, without the dot; matched case-insensitively.
    pub image_extensions: Vec<String>,
    /// Default minimum score for auto-labeling.
    pub confidence_threshold: f64,
    /// Hex colors (`#RRGGBB`) used by the overlay renderer.
    pub palette: Vec<String>,
    /// Outline width of rendered boxes, in pixels.
    pub line_thickness: u32,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            uploads_dir: "uploads".to_string(),
            annotations_dir: "annotations".to_string(),
            models_dir: "models".to_string(),
            image_extensions: ["jpg", "jpeg", "png", "bmp", "tiff"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            confidence_threshold: 0.5,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            line_thickness: 2,
        }
    }
}

impl WorkspaceConfig {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, BoxlabelError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).map_err(BoxlabelError::Io)?;
        Self::from_yaml_str(&data).map_err(|source| BoxlabelError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(data: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes as null rather than an empty mapping.
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(data)
    }

    pub fn save(&self, path: &Path) -> Result<(), BoxlabelError> {
        let yaml = serde_yaml::to_string(self).map_err(|source| BoxlabelError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, yaml).map_err(BoxlabelError::Io)
    }

    /// True if `path` carries one of the configured image extensions.
    pub fn is_image_path(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.image_extensions
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed.trim_start_matches('.')))
    }
}
