//! Rewriting stored class ids after the class list changes.

use std::fmt;

use serde::Serialize;

use super::AnnotationStore;
use crate::error::BoxlabelError;
use crate::ir::ImageKey;
use crate::registry::ClassRegistry;

/// What a class-list migration did to the annotation files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Images whose label file was rewritten.
    pub images_rewritten: usize,
    /// Boxes whose class id changed.
    pub boxes_remapped: usize,
    /// Boxes dropped because their class is gone from the new list.
    pub boxes_dropped: usize,
    /// Boxes dropped because their id was already outside the old list.
    pub boxes_orphaned: usize,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Migrated {} image(s): {} box(es) remapped, {} dropped (class removed), {} dropped (unknown id)",
            self.images_rewritten, self.boxes_remapped, self.boxes_dropped, self.boxes_orphaned
        )
    }
}

impl AnnotationStore {
    /// Re-expresses the boxes of `keys` in terms of `new` by class name.
    ///
    /// Boxes whose class is missing from `new` are removed. Every image that
    /// changes is saved immediately; unchanged images are left alone.
    pub fn migrate_classes<'a, I>(
        &mut self,
        keys: I,
        old: &ClassRegistry,
        new: &ClassRegistry,
    ) -> Result<MigrationReport, BoxlabelError>
    where
        I: IntoIterator<Item = &'a ImageKey>,
    {
        let mapping = old.remap_to(new);
        let mut report = MigrationReport::default();

        for key in keys {
            let set = self.entry(key)?;
            let mut changed = false;
            let mut migrated = Vec::with_capacity(set.len());

            for bbox in set.iter() {
                match mapping.get(bbox.class_id) {
                    Some(Some(new_id)) => {
                        if *new_id != bbox.class_id {
                            report.boxes_remapped += 1;
                            changed = true;
                        }
                        migrated.push(bbox.with_class(*new_id));
                    }
                    Some(None) => {
                        report.boxes_dropped += 1;
                        changed = true;
                    }
                    None => {
                        log::warn!(
                            "'{}' has class id {} outside the old class list; dropping it",
                            key,
                            bbox.class_id
                        );
                        report.boxes_orphaned += 1;
                        changed = true;
                    }
                }
            }

            if changed {
                set.replace_all(migrated);
                self.save(key)?;
                report.images_rewritten += 1;
            }
        }

        Ok(report)
    }
}
