use crate::math::ShapeError;

/// Errors raised by the trainer, calibrator, threshold selector and their
/// persistence helpers.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("{0} must be fitted before use")]
    NotFitted(&'static str),

    #[error(
        "no threshold reaches {slot} recall floor {recall_floor} \
         (best achievable recall {best_recall})"
    )]
    InfeasibleTarget {
        slot: String,
        recall_floor: f64,
        best_recall: f64,
    },

    #[error("label at row {index} is {value}, expected 0 or 1")]
    InvalidLabel { index: usize, value: i32 },

    #[error("weight at row {index} is {value}, expected a finite non-negative number")]
    InvalidWeight { index: usize, value: f64 },

    #[error("non-finite {what} at index {index}")]
    NonFinite { what: &'static str, index: usize },

    #[error("{0} is empty")]
    EmptyInput(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Every label must be 0 or 1.
pub fn check_labels(labels: &[i32]) -> Result<(), ModelError> {
    match labels.iter().position(|&l| l != 0 && l != 1) {
        Some(index) => Err(ModelError::InvalidLabel {
            index,
            value: labels[index],
        }),
        None => Ok(()),
    }
}

/// Weights must be finite and non-negative, with a positive total.
pub fn check_weights(weights: &[f64]) -> Result<(), ModelError> {
    if let Some(index) = weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
        return Err(ModelError::InvalidWeight {
            index,
            value: weights[index],
        });
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(ModelError::InvalidConfig(
            "sample weights sum to zero".to_string(),
        ));
    }
    Ok(())
}

pub fn check_finite(what: &'static str, values: &[f64]) -> Result<(), ModelError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ModelError::NonFinite { what, index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_outside_binary_are_rejected() {
        assert!(check_labels(&[0, 1, 1, 0]).is_ok());
        assert!(matches!(
            check_labels(&[0, 1, -1]),
            Err(ModelError::InvalidLabel { index: 2, value: -1 })
        ));
    }

    #[test]
    fn negative_or_nan_weights_are_rejected() {
        assert!(check_weights(&[1.0, 0.0, 2.5]).is_ok());
        assert!(matches!(
            check_weights(&[1.0, -0.5]),
            Err(ModelError::InvalidWeight { index: 1, .. })
        ));
        assert!(check_weights(&[f64::NAN]).is_err());
        assert!(check_weights(&[0.0, 0.0]).is_err());
    }
}
