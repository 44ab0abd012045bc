//! Per-image results of an auto-labeling run.

use serde::Serialize;
use std::fmt;

use crate::reconcile::ReconcileStats;

/// What happened to one image.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Predictions were reconciled and the label file was written.
    Labeled { stats: ReconcileStats },
    /// The image was skipped; its label file was left untouched.
    Failed { message: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageOutcome {
    pub image: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ImageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// Summary of a batch auto-labeling pass, in processing order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AutolabelReport {
    pub outcomes: Vec<ImageOutcome>,
}

impl AutolabelReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, outcome: ImageOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn labeled_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failure()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Total boxes written across all labeled images.
    pub fn total_boxes(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match &o.status {
                OutcomeStatus::Labeled { stats } => stats.kept,
                OutcomeStatus::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }
}

impl fmt::Display for AutolabelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Labeled {} image(s) with {} box(es); {} failed",
            self.labeled_count(),
            self.total_boxes(),
            self.failed_count()
        )?;

        let dropped: usize = self
            .outcomes
            .iter()
            .map(|o| match &o.status {
                OutcomeStatus::Labeled { stats } => stats.unknown_class + stats.bad_detector_id,
                OutcomeStatus::Failed { .. } => 0,
            })
            .sum();
        if dropped > 0 {
            writeln!(
                f,
                "  {} prediction(s) dropped (class not in project or bad detector id)",
                dropped
            )?;
        }

        if self.failed_count() > 0 {
            writeln!(f)?;
            writeln!(f, "Failures ({}):", self.failed_count())?;
            for outcome in self.failures() {
                if let OutcomeStatus::Failed { message } = &outcome.status {
                    writeln!(f, "  - {}: {}", outcome.image, message)?;
                }
            }
        }

        Ok(())
    }
}
