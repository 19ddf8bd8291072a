pub mod classifier_trait;
pub mod factory;
pub mod isotonic;
pub mod logistic;

pub use classifier_trait::ProbabilisticModel;
pub use isotonic::{Breakpoint, IsotonicCalibrator};
pub use logistic::{LogisticRegression, StopReason, TrainingHistory};
