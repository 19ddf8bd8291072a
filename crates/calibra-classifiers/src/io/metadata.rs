use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::ModelError;
use crate::io::store::Persist;
use crate::math::ShapeError;

/// Sidecar written next to the model artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub created_at: DateTime<Utc>,
    pub package_version: String,
    pub config: PipelineConfig,
    /// One name per fitted feature, in column order.
    pub feature_names: Vec<String>,
    pub n_train_rows: usize,
    pub n_validation_rows: usize,
}

impl ModelMetadata {
    pub fn new(
        config: PipelineConfig,
        feature_names: Vec<String>,
        n_features: usize,
        n_train_rows: usize,
        n_validation_rows: usize,
    ) -> Result<Self, ModelError> {
        ShapeError::check_len("feature names", n_features, feature_names.len())?;
        Ok(Self {
            created_at: Utc::now(),
            package_version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            feature_names,
            n_train_rows,
            n_validation_rows,
        })
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Reject metadata whose feature list disagrees with the fitted width.
    pub fn check_width(&self, n_features: usize) -> Result<(), ModelError> {
        ShapeError::check_len("feature names", n_features, self.feature_names.len())?;
        Ok(())
    }
}

impl Persist for ModelMetadata {}
