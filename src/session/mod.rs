//! An editing session over one workspace.
//!
//! The session owns everything that lives for the duration of a labeling
//! run: the image list with cached dimensions, the cursor, the class
//! registry, the annotation cache and the optional detector. Per-image state is
//! keyed by [`ImageKey`], never by cursor position, so deleting or
//! reordering images cannot attach boxes to the wrong picture.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::autolabel::{self, AutolabelReport};
use crate::detector::Detector;
use crate::error::BoxlabelError;
use crate::ir::{BoundingBox, ImageDescriptor, ImageKey, PixelRect};
use crate::reconcile::ReconcileStats;
use crate::registry::ClassRegistry;
use crate::store::{AnnotationSet, AnnotationStore, MigrationReport};
use crate::workspace::Workspace;

/// A rectangle as reported by an interactive canvas after drawing or editing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasShape {
    #[serde(flatten)]
    pub rect: PixelRect,
    /// Class carried over from the box the shape was created from, if any.
    pub class_id: Option<usize>,
}

pub struct Session {
    workspace: Workspace,
    registry: ClassRegistry,
    store: AnnotationStore,
    detector: Option<Box<dyn Detector>>,
    images: Vec<ImageDescriptor>,
    cursor: usize,
}

impl Session {
    /// Opens a session on `workspace`, listing its images and reading its classes.
    pub fn open(workspace: Workspace) -> Result<Self, BoxlabelError> {
        let registry = workspace.read_registry()?;
        let images = workspace
            .image_paths()?
            .into_iter()
            .map(ImageDescriptor::new)
            .collect::<Vec<_>>();
        let store = workspace.store();

        log::debug!(
            "session opened on {} ({} image(s), {} class(es))",
            workspace.root().display(),
            images.len(),
            registry.len()
        );

        Ok(Self {
            workspace,
            registry,
            store,
            detector: None,
            images,
            cursor: 0,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AnnotationStore {
        &mut self.store
    }

    pub fn images(&self) -> &[ImageDescriptor] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Zero-based cursor position.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&ImageDescriptor> {
        self.images.get(self.cursor)
    }

    fn current_mut(&mut self) -> Result<&mut ImageDescriptor, BoxlabelError> {
        let root = self.workspace.uploads_dir();
        self.images
            .get_mut(self.cursor)
            .ok_or(BoxlabelError::EmptyWorkspace(root))
    }

    fn current_key(&self) -> Result<ImageKey, BoxlabelError> {
        self.current()
            .map(|image| image.key().clone())
            .ok_or_else(|| BoxlabelError::EmptyWorkspace(self.workspace.uploads_dir()))
    }

    /// Moves forward one image; stays put on the last one.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.images.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Moves back one image; stays put on the first one.
    pub fn previous(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    pub fn go_to(&mut self, index: usize) -> Result<(), BoxlabelError> {
        if index >= self.images.len() {
            return Err(BoxlabelError::IndexOutOfRange {
                index,
                len: self.images.len(),
            });
        }
        self.cursor = index;
        Ok(())
    }

    /// Moves the cursor to the image with `key`.
    pub fn go_to_key(&mut self, key: &ImageKey) -> Result<(), BoxlabelError> {
        let index = self
            .images
            .iter()
            .position(|image| image.key() == key)
            .ok_or_else(|| BoxlabelError::ImageNotFound(key.to_string()))?;
        self.cursor = index;
        Ok(())
    }

    /// Boxes of the current image, loading them on first access.
    pub fn current_annotations(&mut self) -> Result<&AnnotationSet, BoxlabelError> {
        let key = self.current_key()?;
        self.store.load(&key)
    }

    /// Boxes of the current image in pixel space, for drawing on a canvas.
    pub fn current_shapes(&mut self) -> Result<Vec<CanvasShape>, BoxlabelError> {
        let key = self.current_key()?;
        let size = self.current_mut()?.size()?;
        let set = self.store.load(&key)?;
        Ok(set
            .iter()
            .map(|bbox| CanvasShape {
                rect: bbox.to_pixel(size),
                class_id: Some(bbox.class_id),
            })
            .collect())
    }

    /// Replaces the current image's boxes with canvas shapes and saves.
    ///
    /// Shapes without a class take `default_class`, which must exist in the
    /// registry. Geometry is converted exactly; nothing is clamped.
    pub fn commit_canvas(
        &mut self,
        shapes: &[CanvasShape],
        default_class: usize,
    ) -> Result<usize, BoxlabelError> {
        self.registry.validate_id(default_class)?;
        let key = self.current_key()?;
        let size = self.current_mut()?.size()?;

        let boxes: Vec<BoundingBox> = shapes
            .iter()
            .map(|shape| {
                shape
                    .rect
                    .to_normalized(shape.class_id.unwrap_or(default_class), size)
            })
            .collect();
        let count = boxes.len();

        self.store.save_replacing(&key, boxes)?;
        Ok(count)
    }

    /// Adds a box drawn in pixel space to the current image (not saved).
    pub fn add_pixel_box(&mut self, class_id: usize, rect: PixelRect) -> Result<usize, BoxlabelError> {
        self.registry.validate_id(class_id)?;
        let key = self.current_key()?;
        let size = self.current_mut()?.size()?;
        self.store.add(&key, rect.to_normalized(class_id, size))
    }

    /// Deletes the current image and its label file, then clamps the cursor.
    pub fn delete_current_image(&mut self) -> Result<ImageDescriptor, BoxlabelError> {
        let key = self.current_key()?;
        let path = self.images[self.cursor].path().to_path_buf();

        self.workspace.delete_image(&path)?;
        self.store.remove(&key)?;
        let removed = self.images.remove(self.cursor);

        if self.cursor >= self.images.len() {
            self.cursor = self.images.len().saturating_sub(1);
        }
        Ok(removed)
    }

    /// Installs a new class list and persists it.
    ///
    /// With `migrate`, every annotation file is rewritten so its boxes keep
    /// their class *names*; without it, stored ids are left as they are.
    pub fn set_registry(
        &mut self,
        registry: ClassRegistry,
        migrate: bool,
    ) -> Result<Option<MigrationReport>, BoxlabelError> {
        let report = if migrate {
            let keys: Vec<ImageKey> = self.images.iter().map(|i| i.key().clone()).collect();
            Some(
                self.store
                    .migrate_classes(keys.iter(), &self.registry, &registry)?,
            )
        } else {
            if registry.len() < self.registry.len() {
                log::warn!(
                    "class list shrank from {} to {} without migration; existing labels may reference missing classes",
                    self.registry.len(),
                    registry.len()
                );
            }
            None
        };

        self.workspace.write_registry(&registry)?;
        self.registry = registry;
        Ok(report)
    }

    pub fn load_detector(&mut self, detector: Box<dyn Detector>) {
        log::info!(
            "detector loaded with {} class(es)",
            detector.class_names().len()
        );
        self.detector = Some(detector);
    }

    pub fn unload_detector(&mut self) {
        self.detector = None;
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    /// Auto-labels the current image.
    pub fn autolabel_current(
        &mut self,
        confidence_threshold: f64,
    ) -> Result<ReconcileStats, BoxlabelError> {
        let root = self.workspace.uploads_dir();
        let image = self
            .images
            .get_mut(self.cursor)
            .ok_or(BoxlabelError::EmptyWorkspace(root))?;
        autolabel::autolabel_image(
            self.detector.as_deref(),
            image,
            &self.registry,
            confidence_threshold,
            &mut self.store,
        )
    }

    /// Auto-labels every image in the session.
    pub fn autolabel_all(
        &mut self,
        confidence_threshold: f64,
    ) -> Result<AutolabelReport, BoxlabelError> {
        autolabel::autolabel_all(
            self.detector.as_deref(),
            &mut self.images,
            &self.registry,
            confidence_threshold,
            &mut self.store,
        )
    }

    /// Index of `path` in the session, matched by key.
    pub fn index_of(&self, path: &Path) -> Option<usize> {
        let key = ImageKey::from_path(path);
        self.images.iter().position(|image| image.key() == &key)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("root", &self.workspace.root())
            .field("images", &self.images.len())
            .field("cursor", &self.cursor)
            .field("classes", &self.registry.len())
            .field("detector", &self.detector.is_some())
            .finish()
    }
}
