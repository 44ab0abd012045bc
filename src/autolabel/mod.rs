//! Bootstrapping labels from a detector.
//!
//! For each image: check that a detector is loaded, check that the image is
//! readable, predict, reconcile the predictions against the project classes,
//! then replace and save the image's annotation set. A batch run is a plain
//! sequential loop; a failing image is logged and reported and the loop moves
//! on to the next one.

mod report;

pub use report::{AutolabelReport, ImageOutcome, OutcomeStatus};

use crate::detector::Detector;
use crate::error::BoxlabelError;
use crate::ir::ImageDescriptor;
use crate::reconcile::{reconcile_with_stats, ReconcileStats};
use crate::registry::ClassRegistry;
use crate::store::AnnotationStore;

/// Labels a single image, overwriting its annotation file.
pub fn autolabel_image(
    detector: Option<&dyn Detector>,
    image: &mut ImageDescriptor,
    registry: &ClassRegistry,
    confidence_threshold: f64,
    store: &mut AnnotationStore,
) -> Result<ReconcileStats, BoxlabelError> {
    let detector = detector.ok_or(BoxlabelError::DetectorUnavailable)?;
    label_with(detector, image, registry, confidence_threshold, store)
}

/// Labels every image in order, isolating per-image failures.
///
/// Only a missing detector aborts the run, and it does so before any image
/// is touched.
pub fn autolabel_all(
    detector: Option<&dyn Detector>,
    images: &mut [ImageDescriptor],
    registry: &ClassRegistry,
    confidence_threshold: f64,
    store: &mut AnnotationStore,
) -> Result<AutolabelReport, BoxlabelError> {
    let detector = detector.ok_or(BoxlabelError::DetectorUnavailable)?;
    let mut report = AutolabelReport::new();

    for image in images.iter_mut() {
        let name = image.path().display().to_string();
        let status = match label_with(detector, image, registry, confidence_threshold, store) {
            Ok(stats) => OutcomeStatus::Labeled { stats },
            Err(err) => {
                log::warn!("auto-labeling {} failed: {}", name, err);
                OutcomeStatus::Failed {
                    message: err.to_string(),
                }
            }
        };
        report.add(ImageOutcome {
            image: name,
            status,
        });
    }

    log::info!(
        "auto-labeled {} image(s), {} failed",
        report.labeled_count(),
        report.failed_count()
    );
    Ok(report)
}

fn label_with(
    detector: &dyn Detector,
    image: &mut ImageDescriptor,
    registry: &ClassRegistry,
    confidence_threshold: f64,
    store: &mut AnnotationStore,
) -> Result<ReconcileStats, BoxlabelError> {
    image.size()?;

    let predictions = detector.predict(image.path(), confidence_threshold)?;
    let (boxes, stats) = reconcile_with_stats(&predictions, detector.class_names(), registry);

    store.save_replacing(image.key(), boxes)?;

    log::info!(
        "labeled {}: {} box(es) kept, {} dropped",
        image.path().display(),
        stats.kept,
        stats.unknown_class + stats.bad_detector_id
    );
    Ok(stats)
}
