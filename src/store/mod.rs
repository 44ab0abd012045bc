//! Per-image annotation state with lazy loading and explicit saves.
//!
//! The store caches one [`AnnotationSet`] per [`ImageKey`]. A set is read from
//! its label file the first time it is touched and stays cached until it is
//! reloaded, evicted or removed; navigating between images never re-reads
//! storage. Saving overwrites the whole file with the in-memory sequence, so
//! once loaded the store is the only writer of truth for that image.

mod migrate;

pub use migrate::MigrationReport;

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::BoxlabelError;
use crate::ir::codec::{self, LABEL_EXTENSION};
use crate::ir::{BoundingBox, ImageKey};
use crate::registry::ClassRegistry;

/// The boxes of one image, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationSet {
    boxes: Vec<BoundingBox>,
    dirty: bool,
}

impl AnnotationSet {
    pub fn new(boxes: Vec<BoundingBox>) -> Self {
        Self {
            boxes,
            dirty: false,
        }
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BoundingBox> {
        self.boxes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BoundingBox> {
        self.boxes.iter()
    }

    /// True when the set has changes that have not been saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Appends a box and returns its position.
    pub fn add(&mut self, bbox: BoundingBox) -> usize {
        self.boxes.push(bbox);
        self.dirty = true;
        self.boxes.len() - 1
    }

    /// Removes the box at `index`; later boxes shift down by one.
    pub fn delete(&mut self, index: usize) -> Result<BoundingBox, BoxlabelError> {
        self.check_index(index)?;
        self.dirty = true;
        Ok(self.boxes.remove(index))
    }

    pub fn update(&mut self, index: usize, bbox: BoundingBox) -> Result<(), BoxlabelError> {
        self.check_index(index)?;
        self.boxes[index] = bbox;
        self.dirty = true;
        Ok(())
    }

    /// Changes only the class of the box at `index`.
    ///
    /// The class id is validated against `registry` before the index, and
    /// nothing is modified when either check fails.
    pub fn replace_class(
        &mut self,
        index: usize,
        new_class_id: usize,
        registry: &ClassRegistry,
    ) -> Result<(), BoxlabelError> {
        registry.validate_id(new_class_id)?;
        self.check_index(index)?;
        self.boxes[index].class_id = new_class_id;
        self.dirty = true;
        Ok(())
    }

    /// Replaces every box at once.
    pub fn replace_all(&mut self, boxes: Vec<BoundingBox>) {
        self.boxes = boxes;
        self.dirty = true;
    }

    fn check_index(&self, index: usize) -> Result<(), BoxlabelError> {
        if index < self.boxes.len() {
            Ok(())
        } else {
            Err(BoxlabelError::IndexOutOfRange {
                index,
                len: self.boxes.len(),
            })
        }
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a BoundingBox;
    type IntoIter = std::slice::Iter<'a, BoundingBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.iter()
    }
}

/// Cache of annotation sets backed by a directory of label files.
#[derive(Debug)]
pub struct AnnotationStore {
    annotations_dir: PathBuf,
    sets: BTreeMap<ImageKey, AnnotationSet>,
}

impl AnnotationStore {
    pub fn new(annotations_dir: impl Into<PathBuf>) -> Self {
        Self {
            annotations_dir: annotations_dir.into(),
            sets: BTreeMap::new(),
        }
    }

    pub fn annotations_dir(&self) -> &Path {
        &self.annotations_dir
    }

    /// Path of the label file backing `key`.
    pub fn annotation_path(&self, key: &ImageKey) -> PathBuf {
        self.annotations_dir
            .join(format!("{}.{}", key.as_str(), LABEL_EXTENSION))
    }

    /// Returns the set for `key`, reading it from storage on first access.
    pub fn load(&mut self, key: &ImageKey) -> Result<&AnnotationSet, BoxlabelError> {
        self.entry(key).map(|set| &*set)
    }

    /// Drops any cached state for `key` and reads the file again.
    pub fn reload(&mut self, key: &ImageKey) -> Result<&AnnotationSet, BoxlabelError> {
        if let Some(old) = self.sets.remove(key) {
            if old.is_dirty() {
                log::warn!("discarding unsaved changes for '{}' on reload", key);
            }
        }
        self.load(key)
    }

    /// Forgets the cached set for `key` without touching storage.
    pub fn evict(&mut self, key: &ImageKey) -> Option<AnnotationSet> {
        self.sets.remove(key)
    }

    /// Returns the cached set for `key` without loading it.
    pub fn cached(&self, key: &ImageKey) -> Option<&AnnotationSet> {
        self.sets.get(key)
    }

    pub fn cached_keys(&self) -> impl Iterator<Item = &ImageKey> {
        self.sets.keys()
    }

    /// True when `key` is cached with unsaved changes.
    pub fn is_dirty(&self, key: &ImageKey) -> bool {
        self.sets.get(key).is_some_and(AnnotationSet::is_dirty)
    }

    pub fn add(&mut self, key: &ImageKey, bbox: BoundingBox) -> Result<usize, BoxlabelError> {
        Ok(self.entry(key)?.add(bbox))
    }

    pub fn delete(&mut self, key: &ImageKey, index: usize) -> Result<BoundingBox, BoxlabelError> {
        self.entry(key)?.delete(index)
    }

    pub fn update(
        &mut self,
        key: &ImageKey,
        index: usize,
        bbox: BoundingBox,
    ) -> Result<(), BoxlabelError> {
        self.entry(key)?.update(index, bbox)
    }

    pub fn replace_class(
        &mut self,
        key: &ImageKey,
        index: usize,
        new_class_id: usize,
        registry: &ClassRegistry,
    ) -> Result<(), BoxlabelError> {
        self.entry(key)?.replace_class(index, new_class_id, registry)
    }

    /// Replaces every box of `key` without reading the old file first.
    pub fn replace_all(&mut self, key: &ImageKey, boxes: Vec<BoundingBox>) {
        self.sets.entry(key.clone()).or_default().replace_all(boxes);
    }

    /// Writes the in-memory set of `key` over its label file.
    pub fn save(&mut self, key: &ImageKey) -> Result<PathBuf, BoxlabelError> {
        let path = self.annotation_path(key);
        let set = self.entry(key)?;
        codec::write_annotation_file(&path, &set.boxes)?;
        set.dirty = false;
        log::info!("saved {} box(es) to {}", set.len(), path.display());
        Ok(path)
    }

    /// Writes `boxes` over the label file of `key`, then caches them as saved.
    ///
    /// On a write error the cache is left as it was.
    pub fn save_replacing(
        &mut self,
        key: &ImageKey,
        boxes: Vec<BoundingBox>,
    ) -> Result<PathBuf, BoxlabelError> {
        let path = self.annotation_path(key);
        codec::write_annotation_file(&path, &boxes)?;
        let set = self.sets.entry(key.clone()).or_default();
        set.boxes = boxes;
        set.dirty = false;
        log::info!("saved {} box(es) to {}", set.len(), path.display());
        Ok(path)
    }

    /// Saves every cached set with unsaved changes, returning how many were written.
    pub fn save_all(&mut self) -> Result<usize, BoxlabelError> {
        let dirty: Vec<ImageKey> = self
            .sets
            .iter()
            .filter(|(_, set)| set.is_dirty())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &dirty {
            self.save(key)?;
        }
        Ok(dirty.len())
    }

    /// Deletes the label file of `key` and forgets its cached set.
    pub fn remove(&mut self, key: &ImageKey) -> Result<(), BoxlabelError> {
        self.sets.remove(key);
        let path = self.annotation_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("removed {}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BoxlabelError::Io(err)),
        }
    }

    fn entry(&mut self, key: &ImageKey) -> Result<&mut AnnotationSet, BoxlabelError> {
        let path = self.annotation_path(key);
        match self.sets.entry(key.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let boxes = codec::read_annotation_file(&path)?;
                log::debug!("loaded {} box(es) for '{}'", boxes.len(), key);
                Ok(entry.insert(AnnotationSet::new(boxes)))
            }
        }
    }
}
