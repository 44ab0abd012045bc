//! Core annotation types and the YOLO label codec.
//!
//! Boxes are stored on disk in normalized center format and edited on a
//! canvas in pixel space. This module owns both representations, the exact
//! conversion between them, and the text format they are persisted in.
//!
//! # Example
//!
//! ```
//! use boxlabel::ir::{codec, BoundingBox, ImageSize, PixelRect};
//!
//! let size = ImageSize::new(640, 480);
//! let drawn = PixelRect::new(64.0, 48.0, 128.0, 96.0);
//! let bbox = drawn.to_normalized(0, size);
//!
//! let text = codec::encode(&[bbox]);
//! assert_eq!(text, "0 0.200000 0.200000 0.200000 0.200000\n");
//! assert_eq!(codec::decode(&text).len(), 1);
//! ```

mod bbox;
pub mod codec;
mod descriptor;
mod ids;
mod transform;

pub use bbox::{BoundingBox, ImageSize, PixelRect};
pub use descriptor::{read_image_dimensions, ImageDescriptor};
pub use ids::ImageKey;
pub use transform::{to_normalized, to_pixel};
