use std::fs;

use boxlabel::ir::{BoundingBox, ImageKey};
use boxlabel::registry::ClassRegistry;
use boxlabel::store::AnnotationStore;
use boxlabel::BoxlabelError;

mod common;

const THREE_ROWS: &str = "0 0.100000 0.100000 0.050000 0.050000\n\
                          1 0.500000 0.500000 0.200000 0.200000\n\
                          0 0.900000 0.900000 0.050000 0.050000\n";

#[test]
fn delete_then_save_leaves_remaining_rows_in_order() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("street.txt");
    fs::write(&path, THREE_ROWS).unwrap();

    let key = ImageKey::new("street");
    let mut store = AnnotationStore::new(temp.path());
    let removed = store.delete(&key, 1).unwrap();
    assert_eq!(removed.class_id, 1);
    store.save(&key).unwrap();

    assert_eq!(
        common::read_lines(&path),
        vec![
            "0 0.100000 0.100000 0.050000 0.050000",
            "0 0.900000 0.900000 0.050000 0.050000",
        ]
    );
}

#[test]
fn unsaved_edits_are_lost_on_reload() {
    let temp = tempfile::tempdir().expect("create temp dir");
    fs::write(temp.path().join("street.txt"), THREE_ROWS).unwrap();

    let key = ImageKey::new("street");
    let mut store = AnnotationStore::new(temp.path());
    store
        .add(&key, BoundingBox::new(2, 0.3, 0.3, 0.1, 0.1))
        .unwrap();
    assert!(store.is_dirty(&key));
    assert_eq!(store.load(&key).unwrap().len(), 4);

    let reloaded = store.reload(&key).unwrap();
    assert_eq!(reloaded.len(), 3);
    assert!(!reloaded.is_dirty());
}

#[test]
fn failed_edits_leave_the_set_untouched() {
    let temp = tempfile::tempdir().expect("create temp dir");
    fs::write(temp.path().join("street.txt"), THREE_ROWS).unwrap();

    let key = ImageKey::new("street");
    let registry = ClassRegistry::new(["car", "person"]);
    let mut store = AnnotationStore::new(temp.path());
    let before = store.load(&key).unwrap().boxes().to_vec();

    assert!(matches!(
        store.delete(&key, 3),
        Err(BoxlabelError::IndexOutOfRange { index: 3, len: 3 })
    ));
    assert!(matches!(
        store.update(&key, 7, BoundingBox::new(0, 0.0, 0.0, 0.0, 0.0)),
        Err(BoxlabelError::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        store.replace_class(&key, 0, 5, &registry),
        Err(BoxlabelError::InvalidClassId { class_id: 5, .. })
    ));

    assert_eq!(store.load(&key).unwrap().boxes(), before.as_slice());
    assert!(!store.is_dirty(&key));
}

#[test]
fn relabel_changes_only_the_class() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("street.txt");
    fs::write(&path, THREE_ROWS).unwrap();

    let key = ImageKey::new("street");
    let registry = ClassRegistry::new(["car", "person"]);
    let mut store = AnnotationStore::new(temp.path());
    store.replace_class(&key, 2, 1, &registry).unwrap();
    store.save(&key).unwrap();

    assert_eq!(
        common::read_lines(&path)[2],
        "1 0.900000 0.900000 0.050000 0.050000"
    );
}

#[test]
fn saving_an_image_without_labels_writes_an_empty_file() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let key = ImageKey::new("empty");
    let mut store = AnnotationStore::new(temp.path().join("annotations"));

    assert!(store.load(&key).unwrap().is_empty());
    let path = store.save(&key).unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "");
}

#[test]
fn malformed_rows_are_dropped_on_the_next_save() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("noisy.txt");
    fs::write(
        &path,
        "0 0.5 0.5 0.1 0.1\nnot a row\n1 0.2 0.2 0.1\n\n2.0 0.3 0.3 0.1 0.1\n",
    )
    .unwrap();

    let key = ImageKey::new("noisy");
    let mut store = AnnotationStore::new(temp.path());
    assert_eq!(store.load(&key).unwrap().len(), 2);
    store.save(&key).unwrap();

    assert_eq!(
        common::read_lines(&path),
        vec![
            "0 0.500000 0.500000 0.100000 0.100000",
            "2 0.300000 0.300000 0.100000 0.100000",
        ]
    );
}
