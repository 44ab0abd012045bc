use std::path::PathBuf;
use thiserror::Error;

/// The main error type for boxlabel operations.
#[derive(Debug, Error)]
pub enum BoxlabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Box index {index} is out of range for an annotation set of {len} box(es)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Class id {class_id} is not valid for a registry of {class_count} class(es)")]
    InvalidClassId { class_id: usize, class_count: usize },

    #[error("Failed to load image {path}: {message}")]
    ImageLoadFailure { path: PathBuf, message: String },

    #[error("No detector is loaded; load one before running auto-labeling")]
    DetectorUnavailable,

    #[error("Image not found in workspace: {0}")]
    ImageNotFound(String),

    #[error("Unknown class '{0}'")]
    UnknownClass(String),

    #[error("Unsupported image type for {path} (supported: {supported})")]
    UnsupportedImageType { path: PathBuf, supported: String },

    #[error("Failed to parse workspace config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse class names from {path}: {message}")]
    NamesFileParse { path: PathBuf, message: String },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image {path}: {source}")]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Workspace {0} has no images")]
    EmptyWorkspace(PathBuf),
}
