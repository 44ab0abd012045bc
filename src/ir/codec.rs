//! YOLO detection label codec.
//!
//! Each line of a label file is `<class_id> <x_center> <y_center> <width> <height>`
//! in normalized coordinates. Decoding is lenient: a row that does not have
//! exactly five tokens, or whose tokens do not parse, is dropped and the rest
//! of the file still loads. Encoding always writes six decimal places.

use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::BoundingBox;
use crate::error::BoxlabelError;

/// File extension used for annotation files.
pub const LABEL_EXTENSION: &str = "txt";

const TOKENS_PER_ROW: usize = 5;

/// Why a row was dropped during decoding.
#[derive(Debug, PartialEq)]
enum RowSkip {
    TokenCount(usize),
    ClassId(String),
    Value { field: &'static str, raw: String },
}

impl std::fmt::Display for RowSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowSkip::TokenCount(n) => write!(f, "expected {TOKENS_PER_ROW} tokens, found {n}"),
            RowSkip::ClassId(raw) => write!(f, "invalid class_id '{raw}'"),
            RowSkip::Value { field, raw } => write!(f, "invalid {field} '{raw}'"),
        }
    }
}

/// Decodes label text into boxes, skipping malformed rows.
pub fn decode(text: &str) -> Vec<BoundingBox> {
    let mut boxes = Vec::new();

    for (line_idx, line) in text.lines().enumerate() {
        match parse_row(line) {
            Ok(Some(bbox)) => boxes.push(bbox),
            Ok(None) => {}
            Err(skip) => {
                log::debug!("skipping annotation line {}: {}", line_idx + 1, skip);
            }
        }
    }

    boxes
}

/// Encodes boxes as label text, one row per box, in the given order.
pub fn encode(boxes: &[BoundingBox]) -> String {
    let mut out = String::with_capacity(boxes.len() * 44);
    for bbox in boxes {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{} {:.6} {:.6} {:.6} {:.6}",
            bbox.class_id, bbox.x_center, bbox.y_center, bbox.width, bbox.height
        );
    }
    out
}

/// Reads an annotation file; a missing file is an empty set.
pub fn read_annotation_file(path: &Path) -> Result<Vec<BoundingBox>, BoxlabelError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(decode(&text)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(BoxlabelError::Io(err)),
    }
}

/// Overwrites an annotation file with the encoded boxes.
pub fn write_annotation_file(path: &Path, boxes: &[BoundingBox]) -> Result<(), BoxlabelError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(BoxlabelError::Io)?;
        }
    }
    fs::write(path, encode(boxes)).map_err(BoxlabelError::Io)
}

fn parse_row(line: &str) -> Result<Option<BoundingBox>, RowSkip> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Take one more than needed so long rows are detected without collecting them.
    let tokens: Vec<&str> = trimmed
        .split_whitespace()
        .take(TOKENS_PER_ROW + 1)
        .collect();
    if tokens.len() != TOKENS_PER_ROW {
        let count = if tokens.len() > TOKENS_PER_ROW {
            trimmed.split_whitespace().count()
        } else {
            tokens.len()
        };
        return Err(RowSkip::TokenCount(count));
    }

    let class_id = parse_class_id(tokens[0])?;
    let x_center = parse_f64_token(tokens[1], "x_center")?;
    let y_center = parse_f64_token(tokens[2], "y_center")?;
    let width = parse_f64_token(tokens[3], "width")?;
    let height = parse_f64_token(tokens[4], "height")?;

    Ok(Some(BoundingBox {
        class_id,
        x_center,
        y_center,
        width,
        height,
    }))
}

/// Float class ids at or above 2^53 no longer name a single integer.
const MAX_FLOAT_CLASS_ID: f64 = 9_007_199_254_740_992.0;

/// Accepts `3` as well as `3.0`; labels written by float-typed tools use the latter.
fn parse_class_id(raw: &str) -> Result<usize, RowSkip> {
    if let Ok(id) = raw.parse::<usize>() {
        return Ok(id);
    }

    match raw.parse::<f64>() {
        Ok(value)
            if value >= 0.0
                && value < MAX_FLOAT_CLASS_ID
                && value < usize::MAX as f64
                && value.fract() == 0.0 =>
        {
            Ok(value as usize)
        }
        _ => Err(RowSkip::ClassId(raw.to_string())),
    }
}

fn parse_f64_token(raw: &str, field: &'static str) -> Result<f64, RowSkip> {
    raw.parse::<f64>().map_err(|_| RowSkip::Value {
        field,
        raw: raw.to_string(),
    })
}

/// Fuzz-only entrypoint for single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_row(input: &str) -> Option<BoundingBox> {
    parse_row(input).ok().flatten()
}
