//! Newtype keys for per-image state.
//!
//! Images and their annotation files are associated purely by file stem, so the
//! stem is the identity every cache and lookup is keyed by.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Stable identity of an image: its file name without directory or extension.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageKey(String);

impl ImageKey {
    /// Creates a key from an already-extracted stem.
    #[inline]
    pub fn new(stem: impl Into<String>) -> Self {
        Self(stem.into())
    }

    /// Derives the key from an image path (`uploads/cat_01.jpg` -> `cat_01`).
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self(stem)
    }

    /// Returns the underlying stem.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageKey({:?})", self.0)
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_strips_directory_and_extension() {
        let key = ImageKey::from_path(Path::new("data/uploads/street_04.JPG"));
        assert_eq!(key.as_str(), "street_04");
    }

    #[test]
    fn key_keeps_inner_dots() {
        let key = ImageKey::from_path(Path::new("frame.0001.png"));
        assert_eq!(key, ImageKey::new("frame.0001"));
    }

    #[test]
    fn keys_order_by_stem() {
        assert!(ImageKey::new("a") < ImageKey::new("b"));
    }
}
