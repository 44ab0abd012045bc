//! The detector seam used by auto-labeling.
//!
//! boxlabel does not run models itself. A [`Detector`] is anything that can
//! turn an image path into normalized, class-indexed predictions and describe
//! its own class list. [`PredictionDirDetector`] reads the text output that
//! Ultralytics writes with `save_txt=True save_conf=True`, which lets a model
//! be run once elsewhere and its output be reconciled here.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::BoxlabelError;
use crate::ir::ImageKey;
use crate::reconcile::Prediction;
use crate::registry::read_names_file;

/// A source of predictions in normalized YOLO geometry.
pub trait Detector {
    /// Predictions for one image at or above `confidence_threshold`.
    fn predict(
        &self,
        image_path: &Path,
        confidence_threshold: f64,
    ) -> Result<Vec<Prediction>, BoxlabelError>;

    /// The detector's own class names, indexed by its class ids.
    fn class_names(&self) -> &[String];
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn predict(
        &self,
        image_path: &Path,
        confidence_threshold: f64,
    ) -> Result<Vec<Prediction>, BoxlabelError> {
        (**self).predict(image_path, confidence_threshold)
    }

    fn class_names(&self) -> &[String] {
        (**self).class_names()
    }
}

const NAMES_CANDIDATES: [&str; 3] = ["data.yaml", "data.yml", "classes.txt"];

/// Detector backed by a directory of precomputed label files.
///
/// Layout: `<dir>/labels/<stem>.txt` (or `<dir>/<stem>.txt`), one row per
/// detection: `cls xc yc w h [conf]`. Class names come from a `data.yaml` or
/// `classes.txt` next to the labels, or from an explicit names file.
#[derive(Clone, Debug)]
pub struct PredictionDirDetector {
    labels_dir: PathBuf,
    class_names: Vec<String>,
}

impl PredictionDirDetector {
    pub fn open(dir: &Path, names_file: Option<&Path>) -> Result<Self, BoxlabelError> {
        if !dir.is_dir() {
            return Err(BoxlabelError::InvalidArgument(format!(
                "prediction directory '{}' does not exist",
                dir.display()
            )));
        }

        let labels_dir = if dir.join("labels").is_dir() {
            dir.join("labels")
        } else {
            dir.to_path_buf()
        };

        let names_path = match names_file {
            Some(path) => path.to_path_buf(),
            None => NAMES_CANDIDATES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
                .ok_or_else(|| BoxlabelError::NamesFileParse {
                    path: dir.to_path_buf(),
                    message: "no data.yaml or classes.txt found; pass a names file".to_string(),
                })?,
        };
        let class_names = read_names_file(&names_path)?;

        log::info!(
            "opened prediction directory {} ({} detector class(es))",
            labels_dir.display(),
            class_names.len()
        );

        Ok(Self {
            labels_dir,
            class_names,
        })
    }

    /// Builds a detector from parts, mostly for tests and embedding.
    pub fn from_parts(labels_dir: impl Into<PathBuf>, class_names: Vec<String>) -> Self {
        Self {
            labels_dir: labels_dir.into(),
            class_names,
        }
    }

    fn label_path(&self, image_path: &Path) -> PathBuf {
        let key = ImageKey::from_path(image_path);
        self.labels_dir.join(format!("{}.txt", key.as_str()))
    }
}

impl Detector for PredictionDirDetector {
    fn predict(
        &self,
        image_path: &Path,
        confidence_threshold: f64,
    ) -> Result<Vec<Prediction>, BoxlabelError> {
        let path = self.label_path(image_path);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::debug!("no predictions for {}", image_path.display());
                return Ok(Vec::new());
            }
            Err(err) => return Err(BoxlabelError::Io(err)),
        };

        let predictions = text
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                let parsed = parse_prediction_row(line);
                if parsed.is_none() && !line.trim().is_empty() {
                    log::debug!("skipping prediction row {} in {}", idx + 1, path.display());
                }
                parsed
            })
            .filter(|pred| pred.confidence.unwrap_or(1.0) >= confidence_threshold)
            .collect();

        Ok(predictions)
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }
}

fn parse_prediction_row(line: &str) -> Option<Prediction> {
    let tokens: Vec<&str> = line.split_whitespace().take(7).collect();
    if tokens.len() != 5 && tokens.len() != 6 {
        return None;
    }

    let class_id = tokens[0].parse::<usize>().ok()?;
    let mut values = [0.0f64; 4];
    for (slot, raw) in values.iter_mut().zip(&tokens[1..5]) {
        *slot = raw.parse().ok()?;
    }

    let pred = Prediction::new(class_id, values[0], values[1], values[2], values[3]);
    match tokens.get(5) {
        Some(raw) => Some(pred.with_confidence(raw.parse().ok()?)),
        None => Some(pred),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prediction_row_handles_optional_confidence() {
        assert_eq!(
            parse_prediction_row("3 0.5 0.5 0.2 0.1"),
            Some(Prediction::new(3, 0.5, 0.5, 0.2, 0.1))
        );
        assert_eq!(
            parse_prediction_row("3 0.5 0.5 0.2 0.1 0.87"),
            Some(Prediction::new(3, 0.5, 0.5, 0.2, 0.1).with_confidence(0.87))
        );
        assert_eq!(parse_prediction_row("3 0.5 0.5 0.2"), None);
        assert_eq!(parse_prediction_row("3 0.5 0.5 0.2 0.1 0.8 0.1"), None);
        assert_eq!(parse_prediction_row("cat 0.5 0.5 0.2 0.1"), None);
    }

    #[test]
    fn open_finds_labels_and_names() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("labels")).unwrap();
        fs::write(temp.path().join("data.yaml"), "names:\n  0: cat\n  1: dog\n").unwrap();
        fs::write(
            temp.path().join("labels/img1.txt"),
            "0 0.5 0.5 0.2 0.2 0.9\n1 0.3 0.3 0.1 0.1 0.2\nbroken\n1 0.7 0.7 0.1 0.1\n",
        )
        .unwrap();

        let detector = PredictionDirDetector::open(temp.path(), None).expect("open detector");
        assert_eq!(detector.class_names(), ["cat", "dog"]);

        let preds = detector
            .predict(Path::new("uploads/img1.jpg"), 0.5)
            .expect("predict");
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].class_id, 0);
        assert_eq!(preds[1].confidence, None);
    }

    #[test]
    fn missing_label_file_means_no_detections() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let detector = PredictionDirDetector::from_parts(temp.path(), vec!["cat".into()]);
        let preds = detector.predict(Path::new("nothing.png"), 0.0).unwrap();
        assert!(preds.is_empty());
    }

    #[test]
    fn open_requires_names() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = PredictionDirDetector::open(temp.path(), None).unwrap_err();
        assert!(matches!(err, BoxlabelError::NamesFileParse { .. }));
    }
}
