use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::ModelError;

/// Hyper-parameters for the logistic regression trainer.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    pub learning_rate: f64,
    pub max_iterations: usize,
    /// Coefficient of the exponential moving average over past gradients.
    pub momentum: f64,
    /// Cap on the global gradient norm. `None` disables clipping.
    pub clip_norm: Option<f64>,
    /// L2 penalty on the weights; the bias is never penalized.
    pub l2_penalty: f64,
    pub patience: usize,
    pub tolerance: f64,
    /// Without a validation set, stop once the gradient norm drops below this.
    pub min_gradient_norm: f64,
    /// Emit a progress line every `log_every` iterations (0 disables).
    pub log_every: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iterations: 1000,
            momentum: 0.9,
            clip_norm: Some(5.0),
            l2_penalty: 1e-4,
            patience: 10,
            tolerance: 1e-4,
            min_gradient_norm: 1e-10,
            log_every: 100,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.max_iterations == 0 || self.patience == 0 {
            return Err(invalid(
                "max_iterations and patience must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(invalid(format!(
                "momentum must lie in [0, 1), got {}",
                self.momentum
            )));
        }
        if let Some(clip) = self.clip_norm {
            if !(clip > 0.0) {
                return Err(invalid(format!("clip_norm must be positive, got {}", clip)));
            }
        }
        if !(self.l2_penalty >= 0.0) {
            return Err(invalid(format!(
                "l2_penalty must be non-negative, got {}",
                self.l2_penalty
            )));
        }
        if !(self.tolerance >= 0.0) || !(self.min_gradient_norm >= 0.0) {
            return Err(invalid(
                "tolerance and min_gradient_norm must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scoring rule used for the `"primary"` operating threshold.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Maximize precision.
    #[default]
    #[serde(alias = "pr_auc")]
    Precision,
    F1,
    FBeta { beta: f64 },
}

impl Objective {
    pub fn name(&self) -> &'static str {
        match self {
            Objective::Precision => "precision",
            Objective::F1 => "f1",
            Objective::FBeta { .. } => "f_beta",
        }
    }
}

impl FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "precision" | "pr_auc" => Ok(Objective::Precision),
            "f1" => Ok(Objective::F1),
            other => {
                // f_beta:<beta>, e.g. "f_beta:0.5"
                if let Some(beta) = other.strip_prefix("f_beta:") {
                    let beta: f64 = beta
                        .parse()
                        .map_err(|_| format!("Invalid beta in objective: {}", s))?;
                    if beta > 0.0 {
                        return Ok(Objective::FBeta { beta });
                    }
                    return Err(format!("beta must be positive: {}", s));
                }
                Err(format!(
                    "Unknown objective: {}. Expected one of precision, pr_auc, f1, f_beta:<beta>",
                    s
                ))
            }
        }
    }
}

/// Configuration for the threshold search.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ThresholdConfig {
    pub objective: Objective,
    /// Strict recall floor for the `"recall_target"` slot.
    pub recall_floor: Option<f64>,
}

impl ThresholdConfig {
    pub fn new(objective: Objective, recall_floor: Option<f64>) -> Self {
        Self {
            objective,
            recall_floor,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some(floor) = self.recall_floor {
            if !(0.0..=1.0).contains(&floor) {
                return Err(invalid(format!(
                    "recall_floor must lie in [0, 1], got {}",
                    floor
                )));
            }
        }
        if let Objective::FBeta { beta } = self.objective {
            if !(beta > 0.0 && beta.is_finite()) {
                return Err(invalid(format!("beta must be positive, got {}", beta)));
            }
        }
        Ok(())
    }
}

/// Which rows the calibrator (and threshold search) is fit on.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationSet {
    /// Held-out validation rows, falling back to training rows when none exist.
    #[default]
    Validation,
    Train,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct CalibrationConfig {
    pub fit_on: CalibrationSet,
}

/// End-to-end configuration: trainer, calibration, thresholds and data split.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub trainer: TrainerConfig,
    pub calibration: CalibrationConfig,
    pub thresholds: ThresholdConfig,
    /// Fraction of training rows held out for validation when no explicit
    /// validation set is given. `None` keeps every row for training.
    pub validation_fraction: Option<f64>,
    pub seed: u64,
    pub label_column: String,
    pub weight_column: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            trainer: TrainerConfig::default(),
            calibration: CalibrationConfig::default(),
            thresholds: ThresholdConfig::default(),
            validation_fraction: None,
            seed: 42,
            label_column: "label".to_string(),
            weight_column: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        self.trainer.validate()?;
        self.thresholds.validate()?;
        if let Some(fraction) = self.validation_fraction {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(invalid(format!(
                    "validation_fraction must lie in (0, 1), got {}",
                    fraction
                )));
            }
        }
        Ok(())
    }
}

/// Read a [`PipelineConfig`] from a JSON file. Missing fields take their
/// defaults; the result is validated.
pub fn load_pipeline_config<P: AsRef<Path>>(path: P) -> anyhow::Result<PipelineConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: PipelineConfig = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in config file: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

fn invalid(msg: String) -> ModelError {
    ModelError::InvalidConfig(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objective_parses_aliases() {
        assert_eq!("pr_auc".parse::<Objective>().unwrap(), Objective::Precision);
        assert_eq!("F1".parse::<Objective>().unwrap(), Objective::F1);
        assert_eq!(
            "f_beta:0.5".parse::<Objective>().unwrap(),
            Objective::FBeta { beta: 0.5 }
        );
        assert!("roc".parse::<Objective>().is_err());
        assert!("f_beta:-1".parse::<Objective>().is_err());
    }

    #[test]
    fn objective_deserializes_from_json() {
        let o: Objective = serde_json::from_str("\"pr_auc\"").unwrap();
        assert_eq!(o, Objective::Precision);
        let o: Objective = serde_json::from_str(r#"{"f_beta": {"beta": 2.0}}"#).unwrap();
        assert_eq!(o, Objective::FBeta { beta: 2.0 });
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{
                "trainer": {"learning_rate": 0.5, "clip_norm": null},
                "thresholds": {"recall_floor": 0.6}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.trainer.learning_rate, 0.5);
        assert_eq!(cfg.trainer.clip_norm, None);
        assert_eq!(cfg.trainer.patience, TrainerConfig::default().patience);
        assert_eq!(cfg.thresholds.recall_floor, Some(0.6));
        assert_eq!(cfg.label_column, "label");
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut cfg = TrainerConfig::default();
        cfg.momentum = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = TrainerConfig::default();
        cfg.clip_norm = Some(0.0);
        assert!(cfg.validate().is_err());

        assert!(ThresholdConfig::new(Objective::Precision, Some(1.5))
            .validate()
            .is_err());

        let mut cfg = PipelineConfig::default();
        cfg.validation_fraction = Some(1.0);
        assert!(cfg.validate().is_err());
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn load_pipeline_config_reads_and_validates_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"{"seed": 7, "thresholds": {"objective": "f1"}}"#).unwrap();
        let cfg = load_pipeline_config(&good).unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.thresholds.objective, Objective::F1);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"trainer": {"momentum": 2.0}}"#).unwrap();
        assert!(load_pipeline_config(&bad).is_err());
        assert!(load_pipeline_config(dir.path().join("missing.json")).is_err());
    }
}
