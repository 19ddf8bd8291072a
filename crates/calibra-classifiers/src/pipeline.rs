//! Train, calibrate and threshold in one pass; persist and restore the result.
//!
//! ```text
//! train rows ──fit──> LogisticRegression ──raw──> IsotonicCalibrator
//!                                                        │
//!                                                   calibrated
//!                                                        ▼
//!                                                ThresholdSelector
//! ```
//!
//! The calibrator and thresholds are fit on the validation rows when there
//! are any (see [`CalibrationSet`]).
use serde::{Deserialize, Serialize};

use crate::config::{CalibrationSet, PipelineConfig};
use crate::data_handling::Dataset;
use crate::error::ModelError;
use crate::io::metadata::ModelMetadata;
use crate::io::report::{MetricsReport, ReportInputs};
use crate::io::store::{ArtifactStore, Persist};
use crate::math::{Array2, ShapeError};
use crate::metrics::ScalarMetrics;
use crate::models::classifier_trait::ProbabilisticModel;
use crate::models::factory::{build_calibrator, build_trainer};
use crate::models::isotonic::IsotonicCalibrator;
use crate::models::logistic::LogisticRegression;
use crate::progress::SharedSink;
use crate::threshold::{OperatingPoint, ThresholdResult, ThresholdSelector, PRIMARY, RECALL_TARGET};

pub const TRAINER_FILE: &str = "trainer.json";
pub const CALIBRATOR_FILE: &str = "calibrator.json";
pub const THRESHOLDS_FILE: &str = "thresholds.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const METRICS_FILE: &str = "metrics.json";

/// Per-row decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub raw_score: f64,
    pub probability: f64,
    pub positive: bool,
}

/// Everything produced by [`train`].
#[derive(Debug, Clone)]
pub struct TrainedPipeline {
    pub trainer: LogisticRegression,
    pub calibrator: IsotonicCalibrator,
    pub thresholds: ThresholdResult,
    pub metadata: ModelMetadata,
    /// Present after training; not reloaded by [`TrainedPipeline::restore`].
    pub report: Option<MetricsReport>,
}

/// Fit `model` on `fit_input` and return its probabilities for `score_input`.
fn fit_and_score<M: ProbabilisticModel>(
    model: &mut M,
    fit_input: &M::Input,
    labels: &[i32],
    weights: Option<&[f64]>,
    score_input: &M::Input,
) -> Result<Vec<f64>, ModelError> {
    log::debug!("Fitting {} on {} rows", model.name(), labels.len());
    model.fit(fit_input, labels, weights)?;
    model.predict_proba(score_input)
}

/// Fit the trainer, calibrator and thresholds.
///
/// `validation` takes precedence over `config.validation_fraction`; with
/// neither, training runs without early stopping and calibration falls back
/// to the training rows.
pub fn train(
    config: &PipelineConfig,
    train: &Dataset,
    validation: Option<&Dataset>,
    sink: SharedSink,
) -> Result<TrainedPipeline, ModelError> {
    config.validate()?;
    if train.is_empty() {
        return Err(ModelError::EmptyInput("training set"));
    }

    let (train_part, validation_part) = match (validation, config.validation_fraction) {
        (Some(v), _) => {
            if v.x.ncols() != train.x.ncols() {
                return Err(ShapeError::FeatureWidth {
                    expected: train.x.ncols(),
                    found: v.x.ncols(),
                }
                .into());
            }
            (train.clone(), Some(v.clone()))
        }
        (None, Some(fraction)) => {
            let (t, v) = train.train_validation_split(fraction, config.seed)?;
            if v.is_empty() {
                log::warn!(
                    "Too few rows to hold out a validation set ({} rows); \
                     training without early stopping",
                    train.len()
                );
                (t, None)
            } else {
                (t, Some(v))
            }
        }
        (None, None) => (train.clone(), None),
    };
    train_part.log_summary("Training set");
    if let Some(v) = &validation_part {
        v.log_summary("Validation set");
    }

    let mut trainer = build_trainer(&config.trainer, sink)?;
    if let Some(v) = &validation_part {
        trainer.set_validation(&v.x, &v.y)?;
    }

    let calibration_rows = match (config.calibration.fit_on, &validation_part) {
        (CalibrationSet::Validation, Some(v)) => v,
        (CalibrationSet::Validation, None) => {
            log::warn!("No validation rows available; calibrating on the training rows");
            &train_part
        }
        (CalibrationSet::Train, _) => &train_part,
    };

    let raw = fit_and_score(
        &mut trainer,
        &train_part.x,
        &train_part.y,
        train_part.weights(),
        &calibration_rows.x,
    )?;
    trainer.clear_validation();

    let mut calibrator = build_calibrator();
    let calibrated = fit_and_score(
        &mut calibrator,
        raw.as_slice(),
        &calibration_rows.y,
        calibration_rows.weights(),
        raw.as_slice(),
    )?;

    let thresholds =
        ThresholdSelector::choose(&calibrated, &calibration_rows.y, &config.thresholds)?;

    let n_validation_rows = validation_part.as_ref().map_or(0, Dataset::len);
    let metadata = ModelMetadata::new(
        config.clone(),
        train_part.feature_names.clone(),
        train_part.x.ncols(),
        train_part.len(),
        n_validation_rows,
    )?;

    let report = MetricsReport::build(ReportInputs {
        raw_scores: &raw,
        calibrated: &calibrated,
        labels: &calibration_rows.y,
        thresholds: &thresholds,
        history: trainer.history(),
        n_train_rows: train_part.len(),
        n_validation_rows,
    })?;
    report.log_summary();

    Ok(TrainedPipeline {
        trainer,
        calibrator,
        thresholds,
        metadata,
        report: Some(report),
    })
}

impl TrainedPipeline {
    /// The operating point for `slot`. A missing `recall_target` reports why
    /// it is missing.
    pub fn operating_point(&self, slot: &str) -> Result<&OperatingPoint, ModelError> {
        if slot == RECALL_TARGET {
            return self.thresholds.recall_target();
        }
        self.thresholds
            .get(slot)
            .ok_or_else(|| ModelError::InvalidConfig(format!("no threshold named '{}'", slot)))
    }

    pub fn calibrated_scores(&self, x: &Array2<f64>) -> Result<(Vec<f64>, Vec<f64>), ModelError> {
        self.metadata.check_width(x.ncols())?;
        let raw = self.trainer.predict_proba(x)?;
        let calibrated = self.calibrator.predict_proba(&raw)?;
        Ok((raw, calibrated))
    }

    /// Verdicts against the `"primary"` threshold.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<Verdict>, ModelError> {
        self.predict_at(x, PRIMARY)
    }

    /// Verdicts against a named threshold slot.
    pub fn predict_at(&self, x: &Array2<f64>, slot: &str) -> Result<Vec<Verdict>, ModelError> {
        let cutoff = self.operating_point(slot)?.threshold;
        let (raw, calibrated) = self.calibrated_scores(x)?;
        Ok(raw
            .into_iter()
            .zip(calibrated)
            .map(|(raw_score, probability)| Verdict {
                raw_score,
                probability,
                positive: probability >= cutoff,
            })
            .collect())
    }

    /// Calibrated metrics on a labelled dataset.
    pub fn evaluate(&self, data: &Dataset) -> Result<ScalarMetrics, ModelError> {
        let (_, calibrated) = self.calibrated_scores(&data.x)?;
        ScalarMetrics::compute(&calibrated, &data.y)
    }

    pub fn persist(&self, store: &dyn ArtifactStore) -> Result<(), ModelError> {
        self.trainer.save_to(store, TRAINER_FILE)?;
        self.calibrator.save_to(store, CALIBRATOR_FILE)?;
        self.thresholds.save_to(store, THRESHOLDS_FILE)?;
        self.metadata.save_to(store, METADATA_FILE)?;
        if let Some(report) = &self.report {
            report.save_to(store, METRICS_FILE)?;
        }
        log::debug!("Persisted pipeline artifacts");
        Ok(())
    }

    pub fn restore(store: &dyn ArtifactStore) -> Result<Self, ModelError> {
        let trainer = LogisticRegression::load_from(store, TRAINER_FILE)?;
        let calibrator = IsotonicCalibrator::load_from(store, CALIBRATOR_FILE)?;
        let thresholds = ThresholdResult::load_from(store, THRESHOLDS_FILE)?;
        let metadata = ModelMetadata::load_from(store, METADATA_FILE)?;

        let width = trainer
            .n_features()
            .ok_or(ModelError::NotFitted("LogisticRegression"))?;
        metadata.check_width(width)?;
        if !calibrator.is_fitted() {
            return Err(ModelError::NotFitted("IsotonicCalibrator"));
        }
        log::debug!(
            "Restored pipeline with {} features (created {})",
            width,
            metadata.created_at.to_rfc3339()
        );

        Ok(Self {
            trainer,
            calibrator,
            thresholds,
            metadata,
            report: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Objective, ThresholdConfig};
    use crate::io::store::MemoryStore;
    use crate::progress::{MemorySink, NullSink};
    use std::sync::Arc;

    fn noisy_dataset(n: usize) -> Dataset {
        // Feature 0 separates the classes with some overlap; feature 1 is noise.
        let rows: Vec<[f64; 2]> = (0..n)
            .map(|i| {
                let label = (i % 2) as f64;
                let jitter = ((i * 37) % 11) as f64 / 10.0 - 0.5;
                [label * 1.5 + jitter, ((i * 13) % 7) as f64 / 7.0]
            })
            .collect();
        let y = (0..n).map(|i| (i % 2) as i32).collect();
        Dataset::new(
            Array2::from_rows(&rows).unwrap(),
            y,
            None,
            vec!["signal".into(), "noise".into()],
        )
        .unwrap()
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            validation_fraction: Some(0.25),
            thresholds: ThresholdConfig::new(Objective::Precision, Some(0.5)),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn train_splits_calibrates_and_thresholds() {
        let data = noisy_dataset(80);
        let sink = Arc::new(MemorySink::new());
        let pipeline = train(&config(), &data, None, sink.clone()).unwrap();

        assert_eq!(pipeline.metadata.n_train_rows, 60);
        assert_eq!(pipeline.metadata.n_validation_rows, 20);
        assert!(pipeline.thresholds.primary().is_some());
        assert!(pipeline.thresholds.recall_target().unwrap().recall >= 0.5);
        assert!(!sink.messages().is_empty());

        let report = pipeline.report.as_ref().unwrap();
        assert_eq!(report.n_evaluation_rows, 20);
        assert!(report.training.iterations > 0);

        let verdicts = pipeline.predict(&data.x).unwrap();
        assert_eq!(verdicts.len(), 80);
        for pair in verdicts.windows(2) {
            if pair[0].raw_score <= pair[1].raw_score {
                assert!(pair[0].probability <= pair[1].probability);
            }
        }
        assert!(verdicts.iter().all(|v| v.raw_score > 0.0 && v.raw_score < 1.0));
    }

    #[test]
    fn explicit_validation_takes_precedence() {
        let data = noisy_dataset(40);
        let validation = noisy_dataset(10);
        let pipeline = train(&config(), &data, Some(&validation), Arc::new(NullSink)).unwrap();
        assert_eq!(pipeline.metadata.n_train_rows, 40);
        assert_eq!(pipeline.metadata.n_validation_rows, 10);
    }

    #[test]
    fn calibration_falls_back_to_training_rows() {
        let data = noisy_dataset(30);
        let config = PipelineConfig::default();
        let pipeline = train(&config, &data, None, Arc::new(NullSink)).unwrap();
        assert_eq!(pipeline.metadata.n_validation_rows, 0);
        assert_eq!(pipeline.report.as_ref().unwrap().n_evaluation_rows, 30);
        assert!(pipeline.thresholds.recall_target().is_err());
    }

    #[test]
    fn tiny_dataset_trains_without_a_validation_split() {
        let data =
            Dataset::unnamed(Array2::from_rows(&[[1.0], [0.0]]).unwrap(), vec![1, 0]).unwrap();
        let config = PipelineConfig {
            validation_fraction: Some(0.25),
            ..PipelineConfig::default()
        };
        let pipeline = train(&config, &data, None, Arc::new(NullSink)).unwrap();
        assert_eq!(pipeline.metadata.n_train_rows, 2);
        assert_eq!(pipeline.metadata.n_validation_rows, 0);
        assert!(pipeline.trainer.history().best_iteration.is_none());
        assert_eq!(pipeline.report.as_ref().unwrap().n_evaluation_rows, 2);
        assert_eq!(pipeline.predict(&data.x).unwrap().len(), 2);
    }

    #[test]
    fn persist_and_restore_reproduce_verdicts() {
        let data = noisy_dataset(60);
        let pipeline = train(&config(), &data, None, Arc::new(NullSink)).unwrap();
        let store = MemoryStore::new();
        pipeline.persist(&store).unwrap();
        assert_eq!(
            store.names(),
            vec![
                CALIBRATOR_FILE,
                METADATA_FILE,
                METRICS_FILE,
                THRESHOLDS_FILE,
                TRAINER_FILE
            ]
        );

        let restored = TrainedPipeline::restore(&store).unwrap();
        assert_eq!(restored.predict(&data.x).unwrap(), pipeline.predict(&data.x).unwrap());
        assert_eq!(restored.thresholds, pipeline.thresholds);
        assert!(restored.report.is_none());
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let data = noisy_dataset(20);
        let narrow =
            Dataset::unnamed(Array2::from_rows(&[[1.0], [0.0]]).unwrap(), vec![1, 0]).unwrap();
        assert!(matches!(
            train(&config(), &data, Some(&narrow), Arc::new(NullSink)),
            Err(ModelError::Shape(_))
        ));

        let pipeline = train(&config(), &data, None, Arc::new(NullSink)).unwrap();
        assert!(matches!(pipeline.predict(&narrow.x), Err(ModelError::Shape(_))));
        assert!(pipeline.operating_point("nope").is_err());
    }

    #[test]
    fn restore_fails_on_missing_artifacts() {
        let store = MemoryStore::new();
        assert!(matches!(TrainedPipeline::restore(&store), Err(ModelError::Io(_))));
    }
}
