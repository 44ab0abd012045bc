//! On-disk layout of a labeling workspace.
//!
//! ```text
//! <root>/
//!   boxlabel.yaml     optional configuration
//!   classes.txt       class registry, one name per line
//!   uploads/          images
//!   annotations/      <image stem>.txt label files
//!   models/           detector outputs, one directory per model
//! ```
//!
//! Images and label files are associated only by file stem. Renaming or
//! moving an image outside boxlabel orphans its label file.

mod config;
mod export;

pub use config::{WorkspaceConfig, CONFIG_FILE, DEFAULT_PALETTE};
pub use export::{DatasetExport, EXPORT_IMAGES_DIR, EXPORT_LABELS_DIR};

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::BoxlabelError;
use crate::ir::codec::LABEL_EXTENSION;
use crate::ir::ImageKey;
use crate::registry::{ClassRegistry, CLASSES_FILE};
use crate::store::AnnotationStore;

/// Class list written by `init` when the workspace has none yet.
pub const DEFAULT_CLASSES: [&str; 3] = ["class1", "class2", "class3"];

/// File name of the exported training descriptor.
pub const DATA_YAML_FILE: &str = "data.yaml";

#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
    config: WorkspaceConfig,
}

impl Workspace {
    /// Creates the workspace directories plus a default config and class list
    /// where they are missing, then opens it.
    pub fn init(root: &Path) -> Result<Self, BoxlabelError> {
        fs::create_dir_all(root).map_err(BoxlabelError::Io)?;

        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            WorkspaceConfig::default().save(&config_path)?;
        }

        let workspace = Self::open(root)?;
        workspace.ensure_dirs()?;

        if !workspace.classes_path().exists() {
            workspace.write_registry(&ClassRegistry::new(DEFAULT_CLASSES))?;
        }

        log::info!("initialized workspace at {}", root.display());
        Ok(workspace)
    }

    /// Opens an existing workspace directory, reading `boxlabel.yaml` if present.
    pub fn open(root: &Path) -> Result<Self, BoxlabelError> {
        if !root.is_dir() {
            return Err(BoxlabelError::InvalidArgument(format!(
                "workspace '{}' is not a directory (run `boxlabel init` first)",
                root.display()
            )));
        }
        let config = WorkspaceConfig::load_or_default(&root.join(CONFIG_FILE))?;
        Ok(Self::with_config(root, config))
    }

    /// Builds a workspace handle without touching the filesystem.
    pub fn with_config(root: &Path, config: WorkspaceConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(&self.config.uploads_dir)
    }

    pub fn annotations_dir(&self) -> PathBuf {
        self.root.join(&self.config.annotations_dir)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join(&self.config.models_dir)
    }

    pub fn classes_path(&self) -> PathBuf {
        self.root.join(CLASSES_FILE)
    }

    pub fn data_yaml_path(&self) -> PathBuf {
        self.root.join(DATA_YAML_FILE)
    }

    pub fn ensure_dirs(&self) -> Result<(), BoxlabelError> {
        for dir in [self.uploads_dir(), self.annotations_dir(), self.models_dir()] {
            fs::create_dir_all(&dir).map_err(BoxlabelError::Io)?;
        }
        Ok(())
    }

    /// A fresh annotation store over this workspace's label directory.
    pub fn store(&self) -> AnnotationStore {
        AnnotationStore::new(self.annotations_dir())
    }

    /// Reads `classes.txt`; a workspace without one has an empty registry.
    pub fn read_registry(&self) -> Result<ClassRegistry, BoxlabelError> {
        match ClassRegistry::read(&self.classes_path()) {
            Ok(registry) => Ok(registry),
            Err(BoxlabelError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                Ok(ClassRegistry::default())
            }
            Err(err) => Err(err),
        }
    }

    pub fn write_registry(&self, registry: &ClassRegistry) -> Result<(), BoxlabelError> {
        registry.write(&self.classes_path())
    }

    /// Images directly inside the uploads directory, sorted by path.
    pub fn image_paths(&self) -> Result<Vec<PathBuf>, BoxlabelError> {
        let uploads = self.uploads_dir();
        if !uploads.is_dir() {
            return Ok(Vec::new());
        }

        let mut images = Vec::new();
        for entry in WalkDir::new(&uploads).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|source| {
                BoxlabelError::Io(
                    source
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory traversal failed")),
                )
            })?;
            if entry.file_type().is_file() && self.config.is_image_path(entry.path()) {
                images.push(entry.into_path());
            }
        }
        images.sort();
        warn_on_shared_stems(&images);
        Ok(images)
    }

    /// Finds an uploaded image by file name (`cat.jpg`) or stem (`cat`).
    pub fn find_image(&self, reference: &str) -> Result<PathBuf, BoxlabelError> {
        let images = self.image_paths()?;
        let by_name = images.iter().find(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy() == reference)
                .unwrap_or(false)
        });
        let found = by_name.or_else(|| {
            images
                .iter()
                .find(|path| ImageKey::from_path(path).as_str() == reference)
        });
        found
            .cloned()
            .ok_or_else(|| BoxlabelError::ImageNotFound(reference.to_string()))
    }

    /// Label file that belongs to `image_path`.
    pub fn annotation_path(&self, image_path: &Path) -> PathBuf {
        let key = ImageKey::from_path(image_path);
        self.annotations_dir()
            .join(format!("{}.{}", key.as_str(), LABEL_EXTENSION))
    }

    /// Copies images into the uploads directory, returning the new paths.
    ///
    /// Every source is checked before anything is copied, so a bad extension
    /// leaves the workspace unchanged.
    pub fn import_images(&self, sources: &[PathBuf]) -> Result<Vec<PathBuf>, BoxlabelError> {
        for source in sources {
            if !self.config.is_image_path(source) {
                return Err(BoxlabelError::UnsupportedImageType {
                    path: source.clone(),
                    supported: self.config.image_extensions.join(", "),
                });
            }
            if !source.is_file() {
                return Err(BoxlabelError::ImageNotFound(source.display().to_string()));
            }
        }

        let uploads = self.uploads_dir();
        fs::create_dir_all(&uploads).map_err(BoxlabelError::Io)?;

        let mut saved = Vec::with_capacity(sources.len());
        for source in sources {
            let Some(file_name) = source.file_name() else {
                continue;
            };
            let target = uploads.join(file_name);
            fs::copy(source, &target).map_err(BoxlabelError::Io)?;
            log::debug!("imported {} -> {}", source.display(), target.display());
            saved.push(target);
        }

        log::info!("imported {} image(s) into {}", saved.len(), uploads.display());
        Ok(saved)
    }

    /// Deletes an image together with its label file.
    pub fn delete_image(&self, image_path: &Path) -> Result<(), BoxlabelError> {
        remove_if_exists(image_path)?;
        remove_if_exists(&self.annotation_path(image_path))?;
        log::info!("deleted {}", image_path.display());
        Ok(())
    }

    /// Directory of a named detector output inside `models/`.
    pub fn model_dir(&self, name: &str) -> PathBuf {
        self.models_dir().join(name)
    }

    /// Names of the detector outputs stored under `models/`.
    pub fn available_models(&self) -> Result<Vec<String>, BoxlabelError> {
        let models = self.models_dir();
        if !models.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&models).map_err(BoxlabelError::Io)? {
            let entry = entry.map_err(BoxlabelError::Io)?;
            if entry.file_type().map_err(BoxlabelError::Io)?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn remove_if_exists(path: &Path) -> Result<(), BoxlabelError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(BoxlabelError::Io(err)),
    }
}

fn warn_on_shared_stems(images: &[PathBuf]) {
    let mut by_key: BTreeMap<ImageKey, &Path> = BTreeMap::new();
    for image in images {
        let key = ImageKey::from_path(image);
        if let Some(first) = by_key.get(&key) {
            log::warn!(
                "{} and {} share the label file '{}.{}'",
                first.display(),
                image.display(),
                key,
                LABEL_EXTENSION
            );
        } else {
            by_key.insert(key, image);
        }
    }
}
