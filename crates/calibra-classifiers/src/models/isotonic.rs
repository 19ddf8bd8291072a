//! Isotonic regression calibrator (pool-adjacent-violators).
//!
//! Learns a non-decreasing mapping from raw scores to probabilities. The
//! fitted map is a list of breakpoints; scores between breakpoints are
//! linearly interpolated and scores outside the fitted range take the
//! boundary value.
use serde::{Deserialize, Serialize};

use crate::error::{check_finite, check_labels, check_weights, ModelError};
use crate::io::store::Persist;
use crate::math::ShapeError;
use crate::models::classifier_trait::ProbabilisticModel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub score: f64,
    pub probability: f64,
}

/// A run of sorted rows sharing one fitted value.
#[derive(Debug, Clone, Copy)]
struct Block {
    lo: f64,
    hi: f64,
    weighted_sum: f64,
    weight: f64,
}

impl Block {
    fn mean(&self) -> f64 {
        self.weighted_sum / self.weight
    }

    fn absorb(&mut self, other: &Block) {
        self.hi = other.hi;
        self.weighted_sum += other.weighted_sum;
        self.weight += other.weight;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredCalibrator")]
pub struct IsotonicCalibrator {
    /// Strictly increasing in `score`, non-decreasing in `probability`.
    breakpoints: Option<Vec<Breakpoint>>,
}

/// Unchecked form of a persisted calibrator.
#[derive(Deserialize)]
struct StoredCalibrator {
    breakpoints: Option<Vec<Breakpoint>>,
}

impl TryFrom<StoredCalibrator> for IsotonicCalibrator {
    type Error = ModelError;

    fn try_from(stored: StoredCalibrator) -> Result<Self, ModelError> {
        if let Some(points) = &stored.breakpoints {
            check_breakpoints(points)?;
        }
        Ok(Self {
            breakpoints: stored.breakpoints,
        })
    }
}

fn check_breakpoints(points: &[Breakpoint]) -> Result<(), ModelError> {
    if points.is_empty() {
        return Err(ModelError::InvalidConfig(
            "calibrator has no breakpoints".to_string(),
        ));
    }
    for (i, point) in points.iter().enumerate() {
        if !point.score.is_finite() || !(0.0..=1.0).contains(&point.probability) {
            return Err(ModelError::InvalidConfig(format!(
                "calibrator breakpoint {} is out of range: ({}, {})",
                i, point.score, point.probability
            )));
        }
    }
    for (i, pair) in points.windows(2).enumerate() {
        if pair[0].score >= pair[1].score || pair[0].probability > pair[1].probability {
            return Err(ModelError::InvalidConfig(format!(
                "calibrator breakpoints {} and {} are not monotone",
                i,
                i + 1
            )));
        }
    }
    Ok(())
}

impl IsotonicCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn breakpoints(&self) -> Option<&[Breakpoint]> {
        self.breakpoints.as_deref()
    }

    /// Calibrated probability for a single raw score.
    pub fn calibrate(&self, score: f64) -> Result<f64, ModelError> {
        let points = self
            .breakpoints
            .as_deref()
            .ok_or(ModelError::NotFitted("IsotonicCalibrator"))?;
        if score.is_nan() {
            return Err(ModelError::NonFinite {
                what: "raw score",
                index: 0,
            });
        }
        Ok(interpolate(points, score))
    }
}

fn interpolate(points: &[Breakpoint], score: f64) -> f64 {
    let idx = points.partition_point(|b| b.score <= score);
    if idx == 0 {
        return points[0].probability;
    }
    if idx == points.len() {
        return points[points.len() - 1].probability;
    }
    let left = points[idx - 1];
    let right = points[idx];
    let t = (score - left.score) / (right.score - left.score);
    (left.probability + t * (right.probability - left.probability))
        .clamp(left.probability, right.probability)
}

/// Pool-adjacent-violators over rows already sorted by score.
fn pool_adjacent_violators(sorted: &[(f64, f64, f64)]) -> Vec<Block> {
    let mut stack: Vec<Block> = Vec::with_capacity(sorted.len());
    for &(score, label, weight) in sorted {
        if weight == 0.0 {
            continue;
        }
        let incoming = Block {
            lo: score,
            hi: score,
            weighted_sum: weight * label,
            weight,
        };
        // Equal scores always share a block.
        match stack.last_mut() {
            Some(last) if last.hi == score => last.absorb(&incoming),
            _ => stack.push(incoming),
        }

        while stack.len() >= 2 {
            let n = stack.len();
            if stack[n - 2].mean() <= stack[n - 1].mean() {
                break;
            }
            if let Some(last) = stack.pop() {
                if let Some(prev) = stack.last_mut() {
                    prev.absorb(&last);
                }
            }
        }
    }
    stack
}

/// Block endpoints, with interior points of equal-valued runs dropped.
fn to_breakpoints(blocks: &[Block]) -> Vec<Breakpoint> {
    let mut raw = Vec::with_capacity(blocks.len() * 2);
    for block in blocks {
        let probability = block.mean();
        raw.push(Breakpoint {
            score: block.lo,
            probability,
        });
        if block.hi > block.lo {
            raw.push(Breakpoint {
                score: block.hi,
                probability,
            });
        }
    }

    let mut points: Vec<Breakpoint> = Vec::with_capacity(raw.len());
    for (i, point) in raw.iter().enumerate() {
        let interior = i > 0
            && i + 1 < raw.len()
            && raw[i - 1].probability == point.probability
            && raw[i + 1].probability == point.probability;
        if !interior {
            points.push(*point);
        }
    }
    points
}

impl ProbabilisticModel for IsotonicCalibrator {
    type Input = [f64];

    fn fit(
        &mut self,
        scores: &[f64],
        labels: &[i32],
        weights: Option<&[f64]>,
    ) -> Result<(), ModelError> {
        if scores.is_empty() {
            return Err(ModelError::EmptyInput("raw scores"));
        }
        ShapeError::check_len("labels", scores.len(), labels.len())?;
        check_labels(labels)?;
        check_finite("raw score", scores)?;
        if let Some(w) = weights {
            ShapeError::check_len("sample weights", scores.len(), w.len())?;
            check_weights(w)?;
        }

        let mut rows: Vec<(f64, f64, f64)> = scores
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(i, (&s, &l))| (s, l as f64, weights.map(|w| w[i]).unwrap_or(1.0)))
            .collect();
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let blocks = pool_adjacent_violators(&rows);
        let points = to_breakpoints(&blocks);
        log::debug!(
            "Isotonic calibration: {} rows pooled into {} blocks, {} breakpoints",
            rows.len(),
            blocks.len(),
            points.len()
        );
        self.breakpoints = Some(points);
        Ok(())
    }

    fn predict_proba(&self, scores: &[f64]) -> Result<Vec<f64>, ModelError> {
        let points = self
            .breakpoints
            .as_deref()
            .ok_or(ModelError::NotFitted("IsotonicCalibrator"))?;
        if let Some(index) = scores.iter().position(|s| s.is_nan()) {
            return Err(ModelError::NonFinite {
                what: "raw score",
                index,
            });
        }
        Ok(scores.iter().map(|&s| interpolate(points, s)).collect())
    }

    fn is_fitted(&self) -> bool {
        self.breakpoints.is_some()
    }

    fn name(&self) -> &str {
        "isotonic"
    }
}

impl Persist for IsotonicCalibrator {}
