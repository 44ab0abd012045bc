#![allow(dead_code)]

use boxlabel::ir::{BoundingBox, ImageSize};
use boxlabel::reconcile::Prediction;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Tolerance of the six-decimal label format.
pub const EPS_LABEL: f64 = 1e-6;

/// Tolerance for pixel/normalized conversions, scaled to the image size.
pub fn eps_transform(size: ImageSize) -> f64 {
    size.width.max(size.height) as f64 * 1e-12 + 1e-12
}

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Words used for both detector and project class names.
pub const CLASS_POOL: [&str; 8] = [
    "person", "car", "dog", "cat", "bird", "truck", "bicycle", "boat",
];

pub fn arb_image_size() -> BoxedStrategy<ImageSize> {
    (1u32..=4096, 1u32..=4096)
        .prop_map(|(w, h)| ImageSize::new(w, h))
        .boxed()
}

/// Boxes with slightly out-of-range geometry mixed in; nothing is clamped.
pub fn arb_bbox(max_class: usize) -> BoxedStrategy<BoundingBox> {
    (
        0..max_class,
        -0.25f64..1.25,
        -0.25f64..1.25,
        0.0f64..1.5,
        0.0f64..1.5,
    )
        .prop_map(|(class_id, x, y, w, h)| BoundingBox::new(class_id, x, y, w, h))
        .boxed()
}

pub fn arb_boxes(max_class: usize, max_len: usize) -> BoxedStrategy<Vec<BoundingBox>> {
    prop::collection::vec(arb_bbox(max_class), 0..=max_len).boxed()
}

/// A non-empty ordered subset of the class pool.
pub fn arb_class_names() -> BoxedStrategy<Vec<String>> {
    prop::sample::subsequence(CLASS_POOL.to_vec(), 1..=CLASS_POOL.len())
        .prop_shuffle()
        .prop_map(|names| names.into_iter().map(str::to_string).collect())
        .boxed()
}

/// Predictions whose ids may run past the end of the detector's class list.
pub fn arb_predictions(max_class: usize, max_len: usize) -> BoxedStrategy<Vec<Prediction>> {
    prop::collection::vec(
        (
            0..max_class,
            0.0f64..1.0,
            0.0f64..1.0,
            0.0f64..1.0,
            0.0f64..1.0,
            prop::option::of(0.0f64..1.0),
        )
            .prop_map(|(class_id, x, y, w, h, conf)| {
                let pred = Prediction::new(class_id, x, y, w, h);
                match conf {
                    Some(conf) => pred.with_confidence(conf),
                    None => pred,
                }
            }),
        0..=max_len,
    )
    .boxed()
}

pub fn assert_boxes_close(a: &[BoundingBox], b: &[BoundingBox], eps: f64) -> Result<(), String> {
    if a.len() != b.len() {
        return Err(format!("length mismatch: {} vs {}", a.len(), b.len()));
    }
    for (idx, (x, y)) in a.iter().zip(b).enumerate() {
        if x.class_id != y.class_id {
            return Err(format!(
                "box {}: class {} vs {}",
                idx, x.class_id, y.class_id
            ));
        }
        let fields = [
            ("x_center", x.x_center, y.x_center),
            ("y_center", x.y_center, y.y_center),
            ("width", x.width, y.width),
            ("height", x.height, y.height),
        ];
        for (name, lhs, rhs) in fields {
            if (lhs - rhs).abs() > eps {
                return Err(format!("box {}: {} {} vs {}", idx, name, lhs, rhs));
            }
        }
    }
    Ok(())
}
