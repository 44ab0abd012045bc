//! Bounding box types: the normalized on-disk form and the pixel canvas form.

use serde::{Deserialize, Serialize};

/// A labeled box in normalized center format (YOLO detection row).
///
/// Geometry is expressed as fractions of the image width and height. Nothing
/// here enforces the `[0, 1]` range or positive sizes: out-of-bounds boxes are
/// carried as-is and only clipped when drawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Position in the class registry at the time the box was stored.
    pub class_id: usize,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Creates a new box from its class id and normalized center geometry.
    #[inline]
    pub fn new(class_id: usize, x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            class_id,
            x_center,
            y_center,
            width,
            height,
        }
    }

    /// Returns a copy with a different class and the same geometry.
    #[inline]
    pub fn with_class(&self, class_id: usize) -> Self {
        Self { class_id, ..*self }
    }

    /// Returns the geometry as an `(x_center, y_center, width, height)` tuple.
    #[inline]
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        (self.x_center, self.y_center, self.width, self.height)
    }

    /// Returns true if all four geometry fields are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x_center.is_finite()
            && self.y_center.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Returns true if the box lies entirely inside the unit square.
    pub fn is_within_bounds(&self) -> bool {
        self.x_center - self.width / 2.0 >= 0.0
            && self.x_center + self.width / 2.0 <= 1.0
            && self.y_center - self.height / 2.0 >= 0.0
            && self.y_center + self.height / 2.0 <= 1.0
    }
}

/// An axis-aligned rectangle in pixel units, anchored at its top-left corner.
///
/// This is the shape an interactive canvas hands back after the user draws or
/// transforms a box. Width and height may be negative if the caller built a
/// rectangle from unordered corners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    #[inline]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Builds a rectangle from two opposite corners in any order.
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let left = x0.min(x1);
        let top = y0.min(y1);
        Self::new(left, top, (x1 - x0).abs(), (y1 - y0).abs())
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Clips the rectangle to the image area and rounds to whole pixels.
    ///
    /// Returns `(x0, y0, x1, y1)` with exclusive upper bounds, or `None` when
    /// nothing of the rectangle is visible.
    pub fn clip_to(&self, size: ImageSize) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = (size.width as f64, size.height as f64);
        let x0 = self.left.min(self.right()).floor().max(0.0);
        let y0 = self.top.min(self.bottom()).floor().max(0.0);
        let x1 = self.left.max(self.right()).ceil().min(w);
        let y1 = self.top.max(self.bottom()).ceil().min(h);

        if !(x0 < x1 && y0 < y1) {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// Pixel dimensions of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if both dimensions are non-zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}
