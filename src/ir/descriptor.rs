//! Image identity plus lazily cached pixel dimensions.

use std::path::{Path, PathBuf};

use super::{ImageKey, ImageSize};
use crate::error::BoxlabelError;

/// An image the session knows about.
///
/// Dimensions are read from the file header the first time they are needed
/// and cached afterwards; the pixel data itself is never decoded here.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageDescriptor {
    path: PathBuf,
    key: ImageKey,
    size: Option<ImageSize>,
}

impl ImageDescriptor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let key = ImageKey::from_path(&path);
        Self {
            path,
            key,
            size: None,
        }
    }

    /// Descriptor with known dimensions, skipping the header read.
    pub fn with_size(path: impl Into<PathBuf>, size: ImageSize) -> Self {
        Self {
            size: Some(size),
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &ImageKey {
        &self.key
    }

    /// Cached dimensions, if they have been read.
    pub fn cached_size(&self) -> Option<ImageSize> {
        self.size
    }

    /// Returns the image dimensions, reading the header on first use.
    pub fn size(&mut self) -> Result<ImageSize, BoxlabelError> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        let size = read_image_dimensions(&self.path)?;
        self.size = Some(size);
        Ok(size)
    }
}

/// Reads width and height from an image header.
pub fn read_image_dimensions(path: &Path) -> Result<ImageSize, BoxlabelError> {
    let size = imagesize::size(path).map_err(|source| BoxlabelError::ImageLoadFailure {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;

    let width: u32 = size
        .width
        .try_into()
        .map_err(|_| BoxlabelError::ImageLoadFailure {
            path: path.to_path_buf(),
            message: format!("image width {} does not fit in u32", size.width),
        })?;
    let height: u32 = size
        .height
        .try_into()
        .map_err(|_| BoxlabelError::ImageLoadFailure {
            path: path.to_path_buf(),
            message: format!("image height {} does not fit in u32", size.height),
        })?;

    let size = ImageSize::new(width, height);
    if !size.is_positive() {
        return Err(BoxlabelError::ImageLoadFailure {
            path: path.to_path_buf(),
            message: format!("image has zero size {}x{}", width, height),
        });
    }
    Ok(size)
}
