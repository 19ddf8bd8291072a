//! calibra-classifiers: calibrated binary classification with operating thresholds.
//!
//! A weighted, L2-regularized logistic regression produces raw scores, an
//! isotonic calibrator maps them to probabilities, and a threshold selector
//! picks decision cutoffs from the precision/recall curve. [`pipeline`] ties
//! the three together and persists them through an [`io::ArtifactStore`].
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod math;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod threshold;

pub use error::ModelError;
