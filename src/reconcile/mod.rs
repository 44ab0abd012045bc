//! Projection of detector output onto the project's class list.
//!
//! A detector numbers its classes in its own label space, usually a superset
//! of what the project cares about. Reconciliation goes through class *names*:
//! detector id -> detector name -> project index. Anything that cannot be
//! resolved is dropped instead of being filed under the wrong class.

use serde::{Deserialize, Serialize};

use crate::ir::BoundingBox;
use crate::registry::ClassRegistry;

/// One raw detection in the detector's class space, normalized geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_id: usize,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    /// Detector score, when the source reports one.
    pub confidence: Option<f64>,
}

impl Prediction {
    pub fn new(class_id: usize, x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            class_id,
            x_center,
            y_center,
            width,
            height,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Counts from a reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub kept: usize,
    /// Detector class exists but the project has no class of that name.
    pub unknown_class: usize,
    /// Detector id is outside the detector's own class list.
    pub bad_detector_id: usize,
}

/// Maps predictions into `registry`'s index space, keeping input order.
pub fn reconcile(
    predictions: &[Prediction],
    detector_classes: &[String],
    registry: &ClassRegistry,
) -> Vec<BoundingBox> {
    reconcile_with_stats(predictions, detector_classes, registry).0
}

/// Same as [`reconcile`], also reporting what was dropped and why.
pub fn reconcile_with_stats(
    predictions: &[Prediction],
    detector_classes: &[String],
    registry: &ClassRegistry,
) -> (Vec<BoundingBox>, ReconcileStats) {
    let mut stats = ReconcileStats::default();
    let mut boxes = Vec::with_capacity(predictions.len());

    for pred in predictions {
        let Some(name) = detector_classes.get(pred.class_id) else {
            stats.bad_detector_id += 1;
            continue;
        };
        let Some(class_id) = registry.index_of(name) else {
            stats.unknown_class += 1;
            continue;
        };

        boxes.push(BoundingBox {
            class_id,
            x_center: pred.x_center,
            y_center: pred.y_center,
            width: pred.width,
            height: pred.height,
        });
        stats.kept += 1;
    }

    if stats.bad_detector_id > 0 {
        log::warn!(
            "{} prediction(s) referenced class ids outside the detector's {} class(es)",
            stats.bad_detector_id,
            detector_classes.len()
        );
    }

    (boxes, stats)
}
