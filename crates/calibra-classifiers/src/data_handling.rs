//! Row-aligned training data and the seeded train/validation split.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{check_labels, check_weights, ModelError};
use crate::math::{Array2, ShapeError};

/// Feature matrix with its labels, optional weights and column names.
///
/// All row-aligned fields have the same length; `feature_names` lines up
/// with the matrix columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Vec<i32>,
    pub weights: Option<Vec<f64>>,
    pub feature_names: Vec<String>,
}

impl Dataset {
    pub fn new(
        x: Array2<f64>,
        y: Vec<i32>,
        weights: Option<Vec<f64>>,
        feature_names: Vec<String>,
    ) -> Result<Self, ModelError> {
        ShapeError::check_len("labels", x.nrows(), y.len())?;
        ShapeError::check_len("feature names", x.ncols(), feature_names.len())?;
        check_labels(&y)?;
        if let Some(w) = &weights {
            ShapeError::check_len("sample weights", x.nrows(), w.len())?;
            check_weights(w)?;
        }
        Ok(Self {
            x,
            y,
            weights,
            feature_names,
        })
    }

    /// Dataset with generated `f0, f1, ...` column names.
    pub fn unnamed(x: Array2<f64>, y: Vec<i32>) -> Result<Self, ModelError> {
        let names = (0..x.ncols()).map(|i| format!("f{}", i)).collect();
        Self::new(x, y, None, names)
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.y.iter().filter(|&&l| l == 1).count()
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select_rows(indices),
            y: indices.iter().map(|&i| self.y[i]).collect(),
            weights: self
                .weights
                .as_ref()
                .map(|w| indices.iter().map(|&i| w[i]).collect()),
            feature_names: self.feature_names.clone(),
        }
    }

    pub fn log_summary(&self, name: &str) {
        log::info!(
            "{}: {} rows ({} positive, {} negative), {} features{}",
            name,
            self.len(),
            self.positives(),
            self.len() - self.positives(),
            self.x.ncols(),
            if self.weights.is_some() {
                ", weighted"
            } else {
                ""
            }
        );
    }

    /// Stratified split into `(train, validation)`.
    ///
    /// Each class is shuffled with a seeded RNG and `fraction` of it (rounded,
    /// at least one row when the class has two or more) goes to validation,
    /// so the same seed always yields the same split. Rows keep their
    /// original relative order inside each part.
    pub fn train_validation_split(
        &self,
        fraction: f64,
        seed: u64,
    ) -> Result<(Dataset, Dataset), ModelError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ModelError::InvalidConfig(format!(
                "validation fraction must lie in (0, 1), got {}",
                fraction
            )));
        }
        if self.is_empty() {
            return Err(ModelError::EmptyInput("dataset"));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut validation_idx = Vec::new();
        for class in [0, 1] {
            let mut members: Vec<usize> = (0..self.len()).filter(|&i| self.y[i] == class).collect();
            members.shuffle(&mut rng);
            let mut take = (members.len() as f64 * fraction).round() as usize;
            if take == 0 && members.len() >= 2 {
                take = 1;
            }
            take = take.min(members.len().saturating_sub(1));
            validation_idx.extend_from_slice(&members[..take]);
        }
        validation_idx.sort_unstable();

        let train_idx: Vec<usize> = (0..self.len())
            .filter(|i| validation_idx.binary_search(i).is_err())
            .collect();

        log::debug!(
            "Split {} rows into {} training and {} validation rows (seed {})",
            self.len(),
            train_idx.len(),
            validation_idx.len(),
            seed
        );
        Ok((self.select(&train_idx), self.select(&validation_idx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy(n: usize) -> Dataset {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        let y = (0..n).map(|i| (i % 2) as i32).collect();
        Dataset::unnamed(Array2::from_rows(&rows).unwrap(), y).unwrap()
    }

    #[test]
    fn new_checks_alignment() {
        let x = Array2::from_rows(&[[1.0, 2.0]]).unwrap();
        assert!(Dataset::new(x.clone(), vec![1, 0], None, vec!["a".into(), "b".into()]).is_err());
        assert!(Dataset::new(x.clone(), vec![1], None, vec!["a".into()]).is_err());
        assert!(Dataset::new(x, vec![1], Some(vec![-1.0]), vec!["a".into(), "b".into()]).is_err());
    }

    #[test]
    fn split_is_stratified_and_reproducible() {
        let data = toy(20);
        let (train, val) = data.train_validation_split(0.2, 11).unwrap();
        assert_eq!(train.len() + val.len(), 20);
        assert_eq!(val.len(), 4);
        assert_eq!(val.positives(), 2);

        let (train2, val2) = data.train_validation_split(0.2, 11).unwrap();
        assert_eq!(train, train2);
        assert_eq!(val, val2);
    }

    #[test]
    fn split_keeps_every_row_exactly_once() {
        let data = toy(15);
        let (train, val) = data.train_validation_split(0.3, 3).unwrap();
        let mut seen: Vec<f64> = train
            .x
            .as_slice()
            .iter()
            .chain(val.x.as_slice())
            .cloned()
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f64> = (0..15).map(|i| i as f64).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn split_rejects_bad_fractions() {
        assert!(toy(4).train_validation_split(0.0, 1).is_err());
        assert!(toy(4).train_validation_split(1.0, 1).is_err());
    }
}
