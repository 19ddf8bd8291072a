use crate::error::ModelError;

/// Capability set shared by the estimators in this crate.
///
/// `Input` is the shape a model consumes: a feature matrix for the trainer,
/// a slice of raw scores for the calibrator. Labels are always 0/1 and
/// weights, when given, align with the rows of `x`.
pub trait ProbabilisticModel {
    type Input: ?Sized;

    fn fit(
        &mut self,
        x: &Self::Input,
        y: &[i32],
        weights: Option<&[f64]>,
    ) -> Result<(), ModelError>;

    /// Probability of the positive class for every row of `x`.
    fn predict_proba(&self, x: &Self::Input) -> Result<Vec<f64>, ModelError>;

    fn is_fitted(&self) -> bool;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "model"
    }
}
