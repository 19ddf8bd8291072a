use crate::config::TrainerConfig;
use crate::error::ModelError;
use crate::models::isotonic::IsotonicCalibrator;
use crate::models::logistic::LogisticRegression;
use crate::progress::SharedSink;

/// Build an unfitted trainer, rejecting out-of-range hyperparameters up front.
pub fn build_trainer(
    config: &TrainerConfig,
    sink: SharedSink,
) -> Result<LogisticRegression, ModelError> {
    config.validate()?;
    Ok(LogisticRegression::new(config.clone()).with_sink(sink))
}

pub fn build_calibrator() -> IsotonicCalibrator {
    IsotonicCalibrator::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classifier_trait::ProbabilisticModel;
    use crate::progress::default_sink;

    #[test]
    fn invalid_hyperparameters_fail_before_training() {
        let config = TrainerConfig {
            learning_rate: -1.0,
            ..TrainerConfig::default()
        };
        assert!(matches!(
            build_trainer(&config, default_sink()),
            Err(ModelError::InvalidConfig(_))
        ));

        let trainer = build_trainer(&TrainerConfig::default(), default_sink()).unwrap();
        assert!(!trainer.is_fitted());
        assert_eq!(trainer.name(), "logistic_regression");
        assert!(!build_calibrator().is_fitted());
    }
}
