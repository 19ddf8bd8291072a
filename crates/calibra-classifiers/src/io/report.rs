use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Objective;
use crate::error::ModelError;
use crate::io::store::Persist;
use crate::metrics::{reliability_bins, ReliabilityBin, ScalarMetrics};
use crate::models::logistic::{StopReason, TrainingHistory};
use crate::threshold::{precision_recall_curve, InfeasibleTarget, OperatingPoint, ThresholdResult};

/// Condensed view of a [`TrainingHistory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub iterations: usize,
    pub best_iteration: Option<usize>,
    pub stop_reason: Option<StopReason>,
    pub final_train_loss: Option<f64>,
    pub final_validation_loss: Option<f64>,
    pub best_validation_loss: Option<f64>,
}

impl From<&TrainingHistory> for TrainingSummary {
    fn from(history: &TrainingHistory) -> Self {
        Self {
            iterations: history.iterations,
            best_iteration: history.best_iteration,
            stop_reason: history.stop_reason,
            final_train_loss: history.train_loss.last().copied(),
            final_validation_loss: history.validation_loss.last().copied(),
            best_validation_loss: history.best_validation_loss,
        }
    }
}

/// Metrics written to `metrics.json` after training.
///
/// Scores are measured on the rows the calibrator and thresholds were fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub generated_at: DateTime<Utc>,
    pub n_train_rows: usize,
    pub n_validation_rows: usize,
    pub n_evaluation_rows: usize,
    pub raw: ScalarMetrics,
    pub calibrated: ScalarMetrics,
    pub objective: Objective,
    pub thresholds: BTreeMap<String, OperatingPoint>,
    #[serde(default)]
    pub unmet: Vec<InfeasibleTarget>,
    pub precision_recall_curve: Vec<OperatingPoint>,
    pub raw_reliability: Vec<ReliabilityBin>,
    pub calibrated_reliability: Vec<ReliabilityBin>,
    pub training: TrainingSummary,
}

/// Inputs needed to assemble a [`MetricsReport`].
pub struct ReportInputs<'a> {
    pub raw_scores: &'a [f64],
    pub calibrated: &'a [f64],
    pub labels: &'a [i32],
    pub thresholds: &'a ThresholdResult,
    pub history: &'a TrainingHistory,
    pub n_train_rows: usize,
    pub n_validation_rows: usize,
}

impl MetricsReport {
    pub fn build(inputs: ReportInputs<'_>) -> Result<Self, ModelError> {
        let bins = ScalarMetrics::CALIBRATION_BINS;
        Ok(Self {
            generated_at: Utc::now(),
            n_train_rows: inputs.n_train_rows,
            n_validation_rows: inputs.n_validation_rows,
            n_evaluation_rows: inputs.labels.len(),
            raw: ScalarMetrics::compute(inputs.raw_scores, inputs.labels)?,
            calibrated: ScalarMetrics::compute(inputs.calibrated, inputs.labels)?,
            objective: inputs.thresholds.objective,
            thresholds: inputs.thresholds.thresholds.clone(),
            unmet: inputs.thresholds.unmet.clone(),
            precision_recall_curve: precision_recall_curve(inputs.calibrated, inputs.labels)?,
            raw_reliability: reliability_bins(inputs.raw_scores, inputs.labels, bins)?,
            calibrated_reliability: reliability_bins(inputs.calibrated, inputs.labels, bins)?,
            training: TrainingSummary::from(inputs.history),
        })
    }

    pub fn log_summary(&self) {
        log::info!(
            "Calibration on {} rows: log-loss {:.4} -> {:.4}, \
             Brier {:.4} -> {:.4}, ECE {:.4} -> {:.4}",
            self.n_evaluation_rows,
            self.raw.log_loss,
            self.calibrated.log_loss,
            self.raw.brier_score,
            self.calibrated.brier_score,
            self.raw.expected_calibration_error,
            self.calibrated.expected_calibration_error,
        );
        for (slot, point) in &self.thresholds {
            log::info!(
                "Threshold {}: {:.6} (precision {:.4}, recall {:.4}, {} predicted positive)",
                slot,
                point.threshold,
                point.precision,
                point.recall,
                point.predicted_positives()
            );
        }
        for target in &self.unmet {
            log::warn!(
                "Threshold {} unmet: recall floor {} not reachable (best {:.4})",
                target.slot,
                target.recall_floor,
                target.best_recall
            );
        }
    }
}

impl Persist for MetricsReport {}
