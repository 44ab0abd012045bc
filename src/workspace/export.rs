//! Copying a workspace into the `images/` + `labels/` layout training tools expect.
//!
//! Ultralytics locates the label file of `.../images/x.jpg` at
//! `.../labels/x.txt`, so labels must sit in a `labels` directory next to
//! the `images` directory.

use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{Workspace, DATA_YAML_FILE};
use crate::error::BoxlabelError;
use crate::registry::write_data_yaml;

/// Image directory name inside an exported dataset.
pub const EXPORT_IMAGES_DIR: &str = "images";
/// Label directory name inside an exported dataset.
pub const EXPORT_LABELS_DIR: &str = "labels";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatasetExport {
    pub root: PathBuf,
    pub images: usize,
    pub labels: usize,
}

impl fmt::Display for DatasetExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Exported {} image(s) and {} label file(s) to {}",
            self.images,
            self.labels,
            self.root.display()
        )
    }
}

impl Workspace {
    /// Whether label files sit where Ultralytics looks for them, i.e. the
    /// label directory is a sibling `labels` of an `images` directory.
    pub fn labels_follow_images(&self) -> bool {
        let images = Path::new(&self.config.uploads_dir);
        images.file_name() == Some(OsStr::new(EXPORT_IMAGES_DIR))
            && Path::new(&self.config.annotations_dir) == images.with_file_name(EXPORT_LABELS_DIR)
    }

    /// Copies every image and its label file into `out/images` and
    /// `out/labels`, then writes `out/data.yaml` pointing at them.
    ///
    /// Images without a label file are copied as background images.
    pub fn export_dataset(&self, out: &Path) -> Result<DatasetExport, BoxlabelError> {
        let images_out = out.join(EXPORT_IMAGES_DIR);
        let labels_out = out.join(EXPORT_LABELS_DIR);
        fs::create_dir_all(&images_out).map_err(BoxlabelError::Io)?;
        fs::create_dir_all(&labels_out).map_err(BoxlabelError::Io)?;

        let mut summary = DatasetExport {
            root: out.to_path_buf(),
            images: 0,
            labels: 0,
        };

        for image in self.image_paths()? {
            let Some(file_name) = image.file_name() else {
                continue;
            };
            fs::copy(&image, images_out.join(file_name)).map_err(BoxlabelError::Io)?;
            summary.images += 1;

            let label = self.annotation_path(&image);
            if label.is_file() {
                let Some(label_name) = label.file_name() else {
                    continue;
                };
                fs::copy(&label, labels_out.join(label_name)).map_err(BoxlabelError::Io)?;
                summary.labels += 1;
            }
        }

        let registry = self.read_registry()?;
        let dataset_root = out.canonicalize().map_err(BoxlabelError::Io)?;
        write_data_yaml(
            &out.join(DATA_YAML_FILE),
            &registry,
            &dataset_root,
            EXPORT_IMAGES_DIR,
            None,
        )?;

        log::info!("{}", summary);
        Ok(summary)
    }
}
