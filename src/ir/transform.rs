//! Conversion between normalized boxes and pixel rectangles.
//!
//! The two functions are exact algebraic inverses for any positive image
//! size. Neither clamps to the image: a box hanging off the edge converts to a
//! rectangle hanging off the edge and back again unchanged.

use super::bbox::{BoundingBox, ImageSize, PixelRect};

/// Converts a normalized box to a pixel rectangle for the given image size.
pub fn to_pixel(bbox: &BoundingBox, size: ImageSize) -> PixelRect {
    let (w, h) = (size.width as f64, size.height as f64);
    PixelRect {
        left: (bbox.x_center - bbox.width / 2.0) * w,
        top: (bbox.y_center - bbox.height / 2.0) * h,
        width: bbox.width * w,
        height: bbox.height * h,
    }
}

/// Converts a pixel rectangle back to a normalized box carrying `class_id`.
pub fn to_normalized(class_id: usize, rect: &PixelRect, size: ImageSize) -> BoundingBox {
    let (w, h) = (size.width as f64, size.height as f64);
    BoundingBox {
        class_id,
        x_center: (rect.left + rect.width / 2.0) / w,
        y_center: (rect.top + rect.height / 2.0) / h,
        width: rect.width / w,
        height: rect.height / h,
    }
}

impl BoundingBox {
    /// Shorthand for [`to_pixel`].
    #[inline]
    pub fn to_pixel(&self, size: ImageSize) -> PixelRect {
        to_pixel(self, size)
    }
}

impl PixelRect {
    /// Shorthand for [`to_normalized`].
    #[inline]
    pub fn to_normalized(&self, class_id: usize, size: ImageSize) -> BoundingBox {
        to_normalized(class_id, self, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn to_pixel_matches_hand_computation() {
        // 640x480, centered box covering half of each axis.
        let rect = to_pixel(
            &BoundingBox::new(0, 0.5, 0.5, 0.5, 0.5),
            ImageSize::new(640, 480),
        );
        assert_close(rect.left, 160.0);
        assert_close(rect.top, 120.0);
        assert_close(rect.width, 320.0);
        assert_close(rect.height, 240.0);
    }

    #[test]
    fn to_normalized_matches_hand_computation() {
        let bbox = to_normalized(
            2,
            &PixelRect::new(10.0, 20.0, 30.0, 40.0),
            ImageSize::new(100, 200),
        );
        assert_eq!(bbox.class_id, 2);
        assert_close(bbox.x_center, 0.25);
        assert_close(bbox.y_center, 0.2);
        assert_close(bbox.width, 0.3);
        assert_close(bbox.height, 0.2);
    }

    #[test]
    fn out_of_bounds_boxes_pass_through() {
        let size = ImageSize::new(100, 100);
        let bbox = BoundingBox::new(1, 0.0, 1.1, 0.4, 0.4);
        let rect = bbox.to_pixel(size);
        assert_close(rect.left, -20.0);
        assert_close(rect.top, 90.0);

        let back = rect.to_normalized(bbox.class_id, size);
        assert_close(back.x_center, 0.0);
        assert_close(back.y_center, 1.1);
    }
}
