//! Operating-threshold selection over the precision/recall curve.
//!
//! Every distinct probability is a candidate cutoff and a row counts as
//! positive when its probability is `>=` the cutoff. Candidates are swept
//! from the highest cutoff down, so "first best" always means "highest
//! threshold", which is the tie-break for every slot.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{Objective, ThresholdConfig};
use crate::error::{check_labels, ModelError};
use crate::io::store::Persist;
use crate::math::ShapeError;

pub const PRIMARY: &str = "primary";
pub const RECALL_TARGET: &str = "recall_target";

/// One candidate cutoff and the confusion counts it produces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    pub threshold: f64,
    pub precision: f64,
    pub recall: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl OperatingPoint {
    pub fn predicted_positives(&self) -> usize {
        self.true_positives + self.false_positives
    }

    pub fn f_beta(&self, beta: f64) -> f64 {
        let b2 = beta * beta;
        let denom = b2 * self.precision + self.recall;
        if denom > 0.0 {
            (1.0 + b2) * self.precision * self.recall / denom
        } else {
            0.0
        }
    }
}

/// A configured target no candidate could satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfeasibleTarget {
    pub slot: String,
    pub recall_floor: f64,
    pub best_recall: f64,
}

impl From<&InfeasibleTarget> for ModelError {
    fn from(value: &InfeasibleTarget) -> Self {
        ModelError::InfeasibleTarget {
            slot: value.slot.clone(),
            recall_floor: value.recall_floor,
            best_recall: value.best_recall,
        }
    }
}

/// Named operating thresholds produced by one [`ThresholdSelector::choose`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub objective: Objective,
    pub thresholds: BTreeMap<String, OperatingPoint>,
    #[serde(default)]
    pub unmet: Vec<InfeasibleTarget>,
}

impl ThresholdResult {
    pub fn get(&self, slot: &str) -> Option<&OperatingPoint> {
        self.thresholds.get(slot)
    }

    pub fn primary(&self) -> Option<&OperatingPoint> {
        self.get(PRIMARY)
    }

    /// The recall-floor threshold, or the reason it is missing.
    pub fn recall_target(&self) -> Result<&OperatingPoint, ModelError> {
        if let Some(point) = self.get(RECALL_TARGET) {
            return Ok(point);
        }
        match self.unmet.iter().find(|u| u.slot == RECALL_TARGET) {
            Some(unmet) => Err(unmet.into()),
            None => Err(ModelError::InvalidConfig(
                "no recall floor was configured".to_string(),
            )),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.unmet.is_empty()
    }
}

impl Persist for ThresholdResult {}

/// Stateless threshold search.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdSelector;

impl ThresholdSelector {
    /// Pick the `"primary"` threshold (and `"recall_target"` when a recall
    /// floor is configured) from calibrated probabilities.
    ///
    /// An unreachable recall floor does not fail the call: the slot is left
    /// out and recorded in [`ThresholdResult::unmet`].
    pub fn choose(
        probabilities: &[f64],
        labels: &[i32],
        config: &ThresholdConfig,
    ) -> Result<ThresholdResult, ModelError> {
        config.validate()?;
        let curve = precision_recall_curve(probabilities, labels)?;

        let mut thresholds = BTreeMap::new();
        let mut unmet = Vec::new();

        let mut best: Option<(f64, OperatingPoint)> = None;
        for point in &curve {
            let score = objective_score(config.objective, point);
            match best {
                Some((best_score, _)) if score <= best_score => {}
                _ => best = Some((score, *point)),
            }
        }
        if let Some((score, point)) = best {
            log::debug!(
                "Primary threshold {} ({} = {:.4}, precision {:.4}, recall {:.4})",
                point.threshold,
                config.objective.name(),
                score,
                point.precision,
                point.recall
            );
            thresholds.insert(PRIMARY.to_string(), point);
        }

        if let Some(floor) = config.recall_floor {
            match curve.iter().find(|p| p.recall >= floor) {
                Some(point) => {
                    thresholds.insert(RECALL_TARGET.to_string(), *point);
                }
                None => {
                    let best_recall = curve.iter().map(|p| p.recall).fold(0.0, f64::max);
                    log::warn!(
                        "No threshold reaches recall floor {} (best recall {})",
                        floor,
                        best_recall
                    );
                    unmet.push(InfeasibleTarget {
                        slot: RECALL_TARGET.to_string(),
                        recall_floor: floor,
                        best_recall,
                    });
                }
            }
        }

        Ok(ThresholdResult {
            objective: config.objective,
            thresholds,
            unmet,
        })
    }
}

fn objective_score(objective: Objective, point: &OperatingPoint) -> f64 {
    match objective {
        Objective::Precision => point.precision,
        Objective::F1 => point.f_beta(1.0),
        Objective::FBeta { beta } => point.f_beta(beta),
    }
}

/// One point per distinct probability, ordered from the highest cutoff to
/// the lowest.
///
/// Precision is 0 when nothing is predicted positive; recall is 0 when the
/// labels contain no positives.
pub fn precision_recall_curve(
    probabilities: &[f64],
    labels: &[i32],
) -> Result<Vec<OperatingPoint>, ModelError> {
    if probabilities.is_empty() {
        return Err(ModelError::EmptyInput("probabilities"));
    }
    ShapeError::check_len("labels", probabilities.len(), labels.len())?;
    check_labels(labels)?;
    if let Some(index) = probabilities.iter().position(|p| p.is_nan()) {
        return Err(ModelError::NonFinite {
            what: "probability",
            index,
        });
    }

    let total_positives = labels.iter().filter(|&&l| l == 1).count();
    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));

    let mut curve = Vec::new();
    let (mut tp, mut fp) = (0usize, 0usize);
    for (pos, &idx) in order.iter().enumerate() {
        if labels[idx] == 1 {
            tp += 1;
        } else {
            fp += 1;
        }
        let threshold = probabilities[idx];
        let group_ends = order
            .get(pos + 1)
            .map(|&next| probabilities[next] != threshold)
            .unwrap_or(true);
        if group_ends {
            curve.push(OperatingPoint {
                threshold,
                precision: ratio(tp, tp + fp),
                recall: ratio(tp, total_positives),
                true_positives: tp,
                false_positives: fp,
                false_negatives: total_positives - tp,
            });
        }
    }
    Ok(curve)
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}
