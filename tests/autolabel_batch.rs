use std::fs;

use boxlabel::autolabel::OutcomeStatus;
use boxlabel::detector::PredictionDirDetector;
use boxlabel::session::Session;
use boxlabel::BoxlabelError;

mod common;

/// Workspace with three images, the second one unreadable, plus a detector
/// output directory with predictions for all three.
fn setup(root: &std::path::Path) -> (Session, PredictionDirDetector) {
    let ws = common::init_workspace(root, &["dog", "bird"]);
    common::write_bmp(&ws.uploads_dir().join("img1.bmp"), 64, 48);
    fs::write(ws.uploads_dir().join("img2.png"), b"not an image at all").unwrap();
    common::write_bmp(&ws.uploads_dir().join("img3.bmp"), 64, 48);

    let model = ws.model_dir("coco");
    fs::create_dir_all(model.join("labels")).unwrap();
    fs::write(model.join("classes.txt"), "cat\ndog\nbird\n").unwrap();
    for stem in ["img1", "img2", "img3"] {
        fs::write(
            model.join("labels").join(format!("{}.txt", stem)),
            "0 0.1 0.1 0.1 0.1 0.90\n1 0.5 0.5 0.2 0.2 0.80\n2 0.7 0.7 0.1 0.1 0.30\n",
        )
        .unwrap();
    }

    let detector = PredictionDirDetector::open(&model, None).unwrap();
    (Session::open(ws).unwrap(), detector)
}

#[test]
fn corrupt_image_does_not_stop_the_batch() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let (mut session, detector) = setup(temp.path());
    session.load_detector(Box::new(detector));

    let report = session.autolabel_all(0.5).unwrap();
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.labeled_count(), 2);
    assert_eq!(report.failed_count(), 1);

    let failed: Vec<_> = report.failures().collect();
    assert!(failed[0].image.ends_with("img2.png"));
    assert!(matches!(failed[0].status, OutcomeStatus::Failed { .. }));

    let annotations = session.workspace().annotations_dir();
    // Only "dog" survives: "cat" is not a project class and "bird" is below 0.5.
    assert_eq!(
        common::read_lines(&annotations.join("img1.txt")),
        vec!["0 0.500000 0.500000 0.200000 0.200000"]
    );
    assert!(!annotations.join("img2.txt").exists());
    assert!(annotations.join("img3.txt").exists());
}

#[test]
fn lower_threshold_keeps_low_confidence_boxes() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let (mut session, detector) = setup(temp.path());
    session.load_detector(Box::new(detector));

    let stats = session.autolabel_current(0.25).unwrap();
    assert_eq!(stats.kept, 2);
    assert_eq!(stats.unknown_class, 1);

    let boxes = session.current_annotations().unwrap();
    assert_eq!(boxes.get(0).unwrap().class_id, 0);
    assert_eq!(boxes.get(1).unwrap().class_id, 1);
}

#[test]
fn autolabel_overwrites_existing_labels() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let (mut session, detector) = setup(temp.path());
    let label = session.workspace().annotations_dir().join("img1.txt");
    fs::write(&label, "1 0.5 0.5 0.9 0.9\n1 0.2 0.2 0.1 0.1\n").unwrap();

    session.load_detector(Box::new(detector));
    session.autolabel_current(0.5).unwrap();
    assert_eq!(common::read_lines(&label).len(), 1);
}

#[test]
fn batch_without_detector_touches_nothing() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let (mut session, _detector) = setup(temp.path());

    let err = session.autolabel_all(0.5).unwrap_err();
    assert!(matches!(err, BoxlabelError::DetectorUnavailable));
    let written = fs::read_dir(session.workspace().annotations_dir())
        .unwrap()
        .count();
    assert_eq!(written, 0);

    session.unload_detector();
    assert!(!session.has_detector());
}
