//! Evaluation metrics for binary probability estimates.
use serde::{Deserialize, Serialize};

use crate::error::{check_labels, ModelError};
use crate::math::ShapeError;
use crate::threshold::precision_recall_curve;

const PROB_EPS: f64 = 1e-15;

fn check_inputs(probabilities: &[f64], labels: &[i32]) -> Result<(), ModelError> {
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
    Ok(())
}

/// Mean binary cross-entropy. Probabilities are clamped to `[1e-15, 1 - 1e-15]`.
pub fn log_loss(probabilities: &[f64], labels: &[i32]) -> Result<f64, ModelError> {
    check_inputs(probabilities, labels)?;
    let total: f64 = probabilities
        .iter()
        .zip(labels)
        .map(|(&p, &l)| {
            let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
            if l == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    Ok(total / probabilities.len() as f64)
}

/// Mean squared error between probability and outcome.
pub fn brier_score(probabilities: &[f64], labels: &[i32]) -> Result<f64, ModelError> {
    check_inputs(probabilities, labels)?;
    let total: f64 = probabilities
        .iter()
        .zip(labels)
        .map(|(&p, &l)| (p - l as f64).powi(2))
        .sum();
    Ok(total / probabilities.len() as f64)
}

/// Area under the ROC curve via the rank-sum statistic (ties get average
/// ranks). `None` when only one class is present.
pub fn roc_auc(scores: &[f64], labels: &[i32]) -> Result<Option<f64>, ModelError> {
    check_inputs(scores, labels)?;
    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Ok(None);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tied group spans start+1 ..= end.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            if labels[idx] == 1 {
                rank_sum_pos += avg_rank;
            }
        }
        start = end;
    }

    let n_pos = n_pos as f64;
    let u = rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0;
    Ok(Some(u / (n_pos * n_neg as f64)))
}

/// Average precision: `sum_k (R_k - R_{k-1}) * P_k` over the
/// precision/recall curve.
pub fn average_precision(scores: &[f64], labels: &[i32]) -> Result<f64, ModelError> {
    let curve = precision_recall_curve(scores, labels)?;
    let mut prev_recall = 0.0;
    let mut ap = 0.0;
    for point in &curve {
        ap += (point.recall - prev_recall) * point.precision;
        prev_recall = point.recall;
    }
    Ok(ap)
}

/// One equal-width probability bin of a reliability diagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub mean_predicted: f64,
    pub observed_rate: f64,
}

/// Equal-width bins over `[0, 1]`; empty bins are omitted.
pub fn reliability_bins(
    probabilities: &[f64],
    labels: &[i32],
    n_bins: usize,
) -> Result<Vec<ReliabilityBin>, ModelError> {
    check_inputs(probabilities, labels)?;
    if n_bins == 0 {
        return Err(ModelError::InvalidConfig(
            "reliability diagrams need at least one bin".to_string(),
        ));
    }

    let mut sums = vec![(0usize, 0.0f64, 0.0f64); n_bins];
    for (&p, &l) in probabilities.iter().zip(labels) {
        let p = p.clamp(0.0, 1.0);
        let bin = ((p * n_bins as f64) as usize).min(n_bins - 1);
        sums[bin].0 += 1;
        sums[bin].1 += p;
        sums[bin].2 += l as f64;
    }

    Ok(sums
        .into_iter()
        .enumerate()
        .filter(|(_, (count, _, _))| *count > 0)
        .map(|(i, (count, p_sum, y_sum))| ReliabilityBin {
            lower: i as f64 / n_bins as f64,
            upper: (i + 1) as f64 / n_bins as f64,
            count,
            mean_predicted: p_sum / count as f64,
            observed_rate: y_sum / count as f64,
        })
        .collect())
}

/// Count-weighted gap between predicted and observed rates.
pub fn expected_calibration_error(
    probabilities: &[f64],
    labels: &[i32],
    n_bins: usize,
) -> Result<f64, ModelError> {
    let bins = reliability_bins(probabilities, labels, n_bins)?;
    let n = probabilities.len() as f64;
    Ok(bins
        .iter()
        .map(|b| b.count as f64 / n * (b.mean_predicted - b.observed_rate).abs())
        .sum())
}

/// Scalar summary written into the metrics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarMetrics {
    pub log_loss: f64,
    pub brier_score: f64,
    pub roc_auc: Option<f64>,
    pub average_precision: f64,
    pub expected_calibration_error: f64,
}

impl ScalarMetrics {
    pub const CALIBRATION_BINS: usize = 10;

    pub fn compute(probabilities: &[f64], labels: &[i32]) -> Result<Self, ModelError> {
        Ok(Self {
            log_loss: log_loss(probabilities, labels)?,
            brier_score: brier_score(probabilities, labels)?,
            roc_auc: roc_auc(probabilities, labels)?,
            average_precision: average_precision(probabilities, labels)?,
            expected_calibration_error: expected_calibration_error(
                probabilities,
                labels,
                Self::CALIBRATION_BINS,
            )?,
        })
    }
}
