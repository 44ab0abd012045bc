//! Preview rendering of annotation boxes onto an image.
//!
//! The renderer never modifies its input: it copies the raster and draws
//! outlines, label tags and label text onto the copy. Boxes are clipped to the
//! image here and nowhere else.

mod glyphs;

use image::{Rgba, RgbaImage};

use crate::error::BoxlabelError;
use crate::ir::{BoundingBox, ImageSize};
use crate::registry::ClassRegistry;
use crate::workspace::{WorkspaceConfig, DEFAULT_PALETTE};

const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TEXT_SCALE: u32 = 2;
const TAG_PADDING: u32 = 2;

/// Fixed list of class colors, indexed by `class_id % len`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgba<u8>>,
}

impl Palette {
    /// Parses `#RRGGBB` (or `RRGGBB`) strings.
    pub fn from_hex<S: AsRef<str>>(colors: &[S]) -> Result<Self, BoxlabelError> {
        if colors.is_empty() {
            return Err(BoxlabelError::InvalidArgument(
                "palette must contain at least one color".to_string(),
            ));
        }
        let colors = colors
            .iter()
            .map(|hex| parse_hex_color(hex.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { colors })
    }

    pub fn color_for(&self, class_id: usize) -> Rgba<u8> {
        self.colors[class_id % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE
                .iter()
                .filter_map(|hex| parse_hex_color(hex).ok())
                .collect(),
        }
    }
}

fn parse_hex_color(raw: &str) -> Result<Rgba<u8>, BoxlabelError> {
    let hex = raw.trim().trim_start_matches('#');
    let invalid = || BoxlabelError::InvalidArgument(format!("invalid color '{raw}'"));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

/// Drawing options for [`render_overlay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayStyle {
    pub palette: Palette,
    pub line_thickness: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            line_thickness: 2,
        }
    }
}

impl OverlayStyle {
    pub fn from_config(config: &WorkspaceConfig) -> Result<Self, BoxlabelError> {
        Ok(Self {
            palette: Palette::from_hex(config.palette.as_slice())?,
            line_thickness: config.line_thickness.max(1),
        })
    }
}

/// Text shown on a box's tag: the class name, or the raw id when the
/// registry has no such class (e.g. after the class list was shortened).
pub fn label_text(class_id: usize, registry: &ClassRegistry) -> String {
    match registry.name(class_id) {
        Some(name) => name.to_string(),
        None => class_id.to_string(),
    }
}

/// Returns a copy of `image` with every box and its label drawn on it.
pub fn render_overlay(
    image: &RgbaImage,
    boxes: &[BoundingBox],
    registry: &ClassRegistry,
    style: &OverlayStyle,
) -> RgbaImage {
    let mut canvas = image.clone();
    let size = ImageSize::new(canvas.width(), canvas.height());
    if !size.is_positive() {
        return canvas;
    }

    for bbox in boxes {
        let rect = bbox.to_pixel(size);
        if !bbox.is_finite() || rect.clip_to(size).is_none() {
            continue;
        }
        let color = style.palette.color_for(bbox.class_id);

        // Corners far off the canvas are pulled in to one canvas size away;
        // the visible part of the box is unchanged.
        let (w, h) = (size.width as f64, size.height as f64);
        let x0 = rect.left.min(rect.right()).floor().clamp(-w, 2.0 * w) as i64;
        let y0 = rect.top.min(rect.bottom()).floor().clamp(-h, 2.0 * h) as i64;
        let x1 = rect.left.max(rect.right()).ceil().clamp(-w, 2.0 * w) as i64;
        let y1 = rect.top.max(rect.bottom()).ceil().clamp(-h, 2.0 * h) as i64;
        draw_outline(&mut canvas, (x0, y0, x1, y1), style.line_thickness as i64, color);

        let text = label_text(bbox.class_id, registry);
        draw_label(&mut canvas, x0, y0, &text, color);
    }

    canvas
}

/// Outline drawn on the inside of the rectangle so thin boxes stay visible.
fn draw_outline(
    canvas: &mut RgbaImage,
    (x0, y0, x1, y1): (i64, i64, i64, i64),
    thickness: i64,
    color: Rgba<u8>,
) {
    let t = thickness.max(1);
    fill_rect(canvas, x0, y0, x1, (y0 + t).min(y1), color);
    fill_rect(canvas, x0, (y1 - t).max(y0), x1, y1, color);
    fill_rect(canvas, x0, y0, (x0 + t).min(x1), y1, color);
    fill_rect(canvas, (x1 - t).max(x0), y0, x1, y1, color);
}

/// Filled tag sitting on top of the box, or just inside it at the top edge.
fn draw_label(canvas: &mut RgbaImage, box_left: i64, box_top: i64, text: &str, color: Rgba<u8>) {
    let text_w = (glyphs::text_width(text) * TEXT_SCALE) as i64;
    let text_h = (glyphs::GLYPH_HEIGHT * TEXT_SCALE) as i64;
    let pad = TAG_PADDING as i64;
    let tag_w = text_w + 2 * pad;
    let tag_h = text_h + 2 * pad;

    let left = box_left.max(0);
    let above = box_top.saturating_sub(tag_h);
    let top = if above >= 0 { above } else { box_top.max(0) };

    fill_rect(canvas, left, top, left + tag_w, top + tag_h, color);
    draw_text(canvas, left + pad, top + pad, text, TEXT_COLOR);
}

fn draw_text(canvas: &mut RgbaImage, x: i64, y: i64, text: &str, color: Rgba<u8>) {
    let scale = TEXT_SCALE as i64;
    let advance = ((glyphs::GLYPH_WIDTH + glyphs::GLYPH_SPACING) * TEXT_SCALE) as i64;

    for (i, c) in text.chars().enumerate() {
        let origin_x = x + i as i64 * advance;
        for (row, bits) in glyphs::glyph(c).iter().enumerate() {
            for col in 0..glyphs::GLYPH_WIDTH {
                if bits & (1 << (glyphs::GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let px = origin_x + col as i64 * scale;
                let py = y + row as i64 * scale;
                fill_rect(canvas, px, py, px + scale, py + scale, color);
            }
        }
    }
}

/// Fills `[x0, x1) x [y0, y1)`, ignoring whatever falls outside the canvas.
fn fill_rect(canvas: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    let (x0, x1) = (x0.clamp(0, w), x1.clamp(0, w));
    let (y0, y1) = (y0.clamp(0, h), y1.clamp(0, h));

    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

    fn black(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, BLACK)
    }

    #[test]
    fn palette_parses_hex_and_cycles() {
        let palette = Palette::from_hex(&["#FF0000", "00ff00"]).unwrap();
        assert_eq!(palette.color_for(0), Rgba([255, 0, 0, 255]));
        assert_eq!(palette.color_for(3), GREEN);
        assert!(Palette::from_hex(&["#12345"]).is_err());
        assert!(Palette::from_hex::<&str>(&[]).is_err());
    }

    #[test]
    fn default_palette_has_ten_colors() {
        let palette = Palette::default();
        assert_eq!(palette.len(), 10);
        assert_eq!(palette.color_for(11), GREEN);
    }

    #[test]
    fn label_text_falls_back_to_id() {
        let registry = ClassRegistry::new(["cat"]);
        assert_eq!(label_text(0, &registry), "cat");
        assert_eq!(label_text(7, &registry), "7");
    }

    #[test]
    fn render_draws_on_a_copy() {
        let input = black(100, 100);
        let registry = ClassRegistry::new(["cat", "dog"]);
        let boxes = [BoundingBox::new(1, 0.5, 0.5, 0.4, 0.4)];

        let output = render_overlay(&input, &boxes, &registry, &OverlayStyle::default());

        assert_eq!(input, black(100, 100));
        // Box spans 30..70 on both axes; left edge and interior.
        assert_eq!(*output.get_pixel(30, 50), GREEN);
        assert_eq!(*output.get_pixel(31, 50), GREEN);
        assert_eq!(*output.get_pixel(32, 50), BLACK);
        assert_eq!(*output.get_pixel(50, 50), BLACK);
        assert_eq!(*output.get_pixel(69, 50), GREEN);
        // Tag is 14px tall and sits above the box; its padding is tag colored.
        assert_eq!(*output.get_pixel(31, 17), GREEN);
        assert_eq!(*output.get_pixel(31, 15), BLACK);
    }

    #[test]
    fn tag_moves_inside_when_box_touches_top() {
        let input = black(60, 60);
        let registry = ClassRegistry::new(["a"]);
        let boxes = [BoundingBox::new(0, 0.5, 0.25, 0.5, 0.5)];

        let output = render_overlay(&input, &boxes, &registry, &OverlayStyle::default());
        // Box top is y=0, so the tag starts at y=0 inside the box.
        assert_eq!(*output.get_pixel(16, 1), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn offscreen_and_nonfinite_boxes_are_skipped() {
        let input = black(50, 50);
        let registry = ClassRegistry::new(["a"]);
        let boxes = [
            BoundingBox::new(0, 2.0, 2.0, 0.1, 0.1),
            BoundingBox::new(0, f64::NAN, 0.5, 0.1, 0.1),
        ];

        let output = render_overlay(&input, &boxes, &registry, &OverlayStyle::default());
        assert_eq!(output, input);
    }

    #[test]
    fn huge_finite_box_is_clipped_not_dropped() {
        let input = black(50, 50);
        let registry = ClassRegistry::new(["a"]);
        let boxes = [BoundingBox::new(0, 0.5, 0.5, 0.2, 1e300)];
        let red = Rgba([255, 0, 0, 255]);

        let output = render_overlay(&input, &boxes, &registry, &OverlayStyle::default());
        // Spans x 20..30 and the full height: side edges drawn, top and bottom offscreen.
        assert_eq!(*output.get_pixel(20, 40), red);
        assert_eq!(*output.get_pixel(29, 40), red);
        assert_eq!(*output.get_pixel(25, 40), BLACK);
        // Tag pushed inside at the top of the canvas.
        assert_eq!(*output.get_pixel(20, 0), red);
    }

    #[test]
    fn style_from_config_uses_configured_palette() {
        let config = WorkspaceConfig {
            palette: vec!["#0000FF".to_string()],
            line_thickness: 0,
            ..Default::default()
        };
        let style = OverlayStyle::from_config(&config).unwrap();
        assert_eq!(style.palette.color_for(4), Rgba([0, 0, 255, 255]));
        assert_eq!(style.line_thickness, 1);
    }
}
