//! L2-regularized logistic regression fit by full-batch gradient descent.
//!
//! Each iteration computes the weighted mean log-loss gradient, adds the L2
//! term (bias excluded), clips the combined gradient to a global norm and
//! applies a momentum update. Logits are clipped before the sigmoid, so
//! predicted probabilities stay strictly inside (0, 1) for any finite input.
use std::fmt;

use log::Level;
use serde::{Deserialize, Serialize};

use crate::config::TrainerConfig;
use crate::error::{check_labels, check_weights, ModelError};
use crate::io::store::Persist;
use crate::math::ops::{clip_by_global_norm, log_loss_term, sigmoid};
use crate::math::vector::{dot, l2_norm};
use crate::math::{Array1, Array2, ShapeError};
use crate::models::classifier_trait::ProbabilisticModel;
use crate::progress::{default_sink, SharedSink};

/// Why training ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxIterations,
    EarlyStopped,
    /// Gradient norm fell below `min_gradient_norm`.
    Converged,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::MaxIterations => "max iterations reached",
            StopReason::EarlyStopped => "early stopped",
            StopReason::Converged => "converged",
        };
        write!(f, "{}", s)
    }
}

/// Per-iteration losses recorded during `fit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Number of parameter updates applied.
    pub iterations: usize,
    /// Penalized training loss, measured before each update.
    pub train_loss: Vec<f64>,
    /// Validation log-loss after each update.
    pub validation_loss: Vec<f64>,
    /// 1-based update count whose weights were kept.
    pub best_iteration: Option<usize>,
    pub best_validation_loss: Option<f64>,
    pub stop_reason: Option<StopReason>,
}

#[derive(Debug, Clone)]
struct ValidationSet {
    x: Array2<f64>,
    y: Vec<f64>,
}

impl ValidationSet {
    fn loss(&self, weights: &[f64], bias: f64) -> f64 {
        let total: f64 = self
            .x
            .rows()
            .zip(self.y.iter())
            .map(|(row, &label)| log_loss_term(sigmoid(dot(row, weights) + bias), label))
            .sum();
        total / self.y.len() as f64
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: TrainerConfig,
    /// `None` until a successful fit.
    weights: Option<Vec<f64>>,
    bias: f64,
    #[serde(default)]
    history: TrainingHistory,
    #[serde(skip)]
    validation: Option<ValidationSet>,
    #[serde(skip, default = "default_sink")]
    sink: SharedSink,
}

impl fmt::Debug for LogisticRegression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogisticRegression")
            .field("config", &self.config)
            .field("weights", &self.weights)
            .field("bias", &self.bias)
            .field("history", &self.history)
            .field(
                "validation_rows",
                &self.validation.as_ref().map(|v| v.y.len()),
            )
            .finish()
    }
}

impl LogisticRegression {
    pub fn new(config: TrainerConfig) -> Self {
        LogisticRegression {
            config,
            weights: None,
            bias: 0.0,
            history: TrainingHistory::default(),
            validation: None,
            sink: default_sink(),
        }
    }

    /// Attach a held-out validation set used for early stopping.
    ///
    /// The rows are copied; later changes to the caller's data have no effect.
    pub fn with_validation(mut self, x: &Array2<f64>, y: &[i32]) -> Result<Self, ModelError> {
        self.set_validation(x, y)?;
        Ok(self)
    }

    pub fn set_validation(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<(), ModelError> {
        if x.is_empty() {
            return Err(ModelError::EmptyInput("validation matrix"));
        }
        ShapeError::check_len("validation labels", x.nrows(), y.len())?;
        check_labels(y)?;
        if let Some((row, _)) = x.first_non_finite() {
            return Err(ModelError::NonFinite {
                what: "validation feature",
                index: row,
            });
        }
        self.validation = Some(ValidationSet {
            x: x.clone(),
            y: y.iter().map(|&l| l as f64).collect(),
        });
        Ok(())
    }

    pub fn clear_validation(&mut self) {
        self.validation = None;
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn set_sink(&mut self, sink: SharedSink) {
        self.sink = sink;
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn n_features(&self) -> Option<usize> {
        self.weights.as_ref().map(|w| w.len())
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// Unclipped linear scores `w·x + b`.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        let weights = self
            .weights
            .as_ref()
            .ok_or(ModelError::NotFitted("LogisticRegression"))?;
        if let Some((row, _)) = x.first_non_finite() {
            return Err(ModelError::NonFinite {
                what: "feature value",
                index: row,
            });
        }
        Ok(x.affine(weights, self.bias)?)
    }

    fn emit(&self, level: Level, message: &str) {
        self.sink.emit(level, message);
    }

    /// Penalized weighted log-loss at `params`; writes the gradient into `grad`.
    ///
    /// `params` and `grad` hold the feature weights followed by the bias.
    fn objective(
        &self,
        x: &Array2<f64>,
        targets: &[f64],
        scales: &[f64],
        params: &[f64],
        grad: &mut [f64],
    ) -> f64 {
        let d = x.ncols();
        let (w, b) = params.split_at(d);
        let bias = b[0];
        grad.iter_mut().for_each(|g| *g = 0.0);

        let mut loss = 0.0;
        for ((row, &target), &scale) in x.rows().zip(targets).zip(scales) {
            let p = sigmoid(dot(row, w) + bias);
            let err = (p - target) * scale;
            for (g, &v) in grad[..d].iter_mut().zip(row) {
                *g += err * v;
            }
            grad[d] += err;
            loss += scale * log_loss_term(p, target);
        }

        let lambda = self.config.l2_penalty;
        if lambda > 0.0 {
            for (g, &wj) in grad[..d].iter_mut().zip(w) {
                *g += lambda * wj;
            }
            loss += 0.5 * lambda * dot(w, w);
        }
        loss
    }

    fn check_training_input(
        &self,
        x: &Array2<f64>,
        y: &[i32],
        weights: Option<&[f64]>,
    ) -> Result<(), ModelError> {
        self.config.validate()?;
        if x.is_empty() {
            return Err(ModelError::EmptyInput("training matrix"));
        }
        ShapeError::check_len("labels", x.nrows(), y.len())?;
        check_labels(y)?;
        if let Some(w) = weights {
            ShapeError::check_len("sample weights", x.nrows(), w.len())?;
            check_weights(w)?;
        }
        if let Some((row, _)) = x.first_non_finite() {
            return Err(ModelError::NonFinite {
                what: "feature value",
                index: row,
            });
        }
        if let Some(validation) = &self.validation {
            if validation.x.ncols() != x.ncols() {
                return Err(ShapeError::FeatureWidth {
                    expected: x.ncols(),
                    found: validation.x.ncols(),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl ProbabilisticModel for LogisticRegression {
    type Input = Array2<f64>;

    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[i32],
        weights: Option<&[f64]>,
    ) -> Result<(), ModelError> {
        self.check_training_input(x, y, weights)?;

        let n = x.nrows();
        let d = x.ncols();
        let cfg = self.config.clone();

        let targets: Vec<f64> = y.iter().map(|&l| l as f64).collect();
        let total_weight: f64 = weights.map(|w| w.iter().sum()).unwrap_or(n as f64);
        let scales: Vec<f64> = match weights {
            Some(w) => w.iter().map(|wi| wi / total_weight).collect(),
            None => vec![1.0 / total_weight; n],
        };

        let mut params = Array1::<f64>::zeros(d + 1);
        let mut velocity = Array1::<f64>::zeros(d + 1);
        let mut grad = Array1::<f64>::zeros(d + 1);
        let mut history = TrainingHistory::default();
        let mut best: Option<(f64, Array1<f64>, usize)> = None;
        let mut stale = 0usize;
        let mut stop_reason = StopReason::MaxIterations;

        self.emit(
            Level::Info,
            &format!(
                "Training logistic regression on {} rows x {} features \
                 ({} validation rows, clip norm {:?})",
                n,
                d,
                self.validation.as_ref().map(|v| v.y.len()).unwrap_or(0),
                cfg.clip_norm
            ),
        );

        for iteration in 0..cfg.max_iterations {
            let train_loss =
                self.objective(x, &targets, &scales, params.as_slice(), grad.as_mut_slice());
            history.train_loss.push(train_loss);

            let grad_norm = match cfg.clip_norm {
                Some(max_norm) => clip_by_global_norm(grad.as_mut_slice(), max_norm),
                None => l2_norm(grad.as_slice()),
            };

            if self.validation.is_none() && grad_norm < cfg.min_gradient_norm {
                stop_reason = StopReason::Converged;
                break;
            }

            // v <- mu * v + (1 - mu) * g ; theta <- theta - lr * v
            velocity.scale(cfg.momentum);
            velocity.scaled_add(1.0 - cfg.momentum, &grad);
            params.scaled_add(-cfg.learning_rate, &velocity);
            history.iterations = iteration + 1;

            if let Some(validation) = &self.validation {
                let (w, b) = params.as_slice().split_at(d);
                let val_loss = validation.loss(w, b[0]);
                history.validation_loss.push(val_loss);

                let best_loss = best.as_ref().map(|b| b.0).unwrap_or(f64::INFINITY);
                if val_loss < best_loss - cfg.tolerance {
                    stale = 0;
                } else {
                    stale += 1;
                }
                if val_loss < best_loss {
                    best = Some((val_loss, params.clone(), iteration + 1));
                }
                if stale >= cfg.patience {
                    stop_reason = StopReason::EarlyStopped;
                    break;
                }
            }

            if cfg.log_every > 0 && (iteration + 1) % cfg.log_every == 0 {
                self.emit(
                    Level::Debug,
                    &format!(
                        "iteration {}: train loss {:.6}, validation loss {}, gradient norm {:.4e}",
                        iteration + 1,
                        train_loss,
                        history
                            .validation_loss
                            .last()
                            .map(|l| format!("{:.6}", l))
                            .unwrap_or_else(|| "-".to_string()),
                        grad_norm
                    ),
                );
            }
        }

        if let Some((loss, snapshot, at)) = best {
            params = snapshot;
            history.best_iteration = Some(at);
            history.best_validation_loss = Some(loss);
        }
        history.stop_reason = Some(stop_reason);

        let mut values = params.into_vec();
        self.bias = values.pop().unwrap_or(0.0);
        self.weights = Some(values);

        self.emit(
            Level::Info,
            &format!(
                "Training stopped ({}) after {} iterations{}",
                stop_reason,
                history.iterations,
                match (history.best_iteration, history.best_validation_loss) {
                    (Some(at), Some(loss)) =>
                        format!("; kept iteration {} with validation loss {:.6}", at, loss),
                    _ => String::new(),
                }
            ),
        );
        self.history = history;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(sigmoid)
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}

impl Persist for LogisticRegression {}
