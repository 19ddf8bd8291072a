use std::slice::Iter;

use num_traits::{Float, Zero};

/// Owned 1-D buffer; the trainer keeps its parameters, momentum and
/// gradient in these.
#[derive(Clone, Debug, PartialEq)]
pub struct Array1<T> {
    data: Vec<T>,
}

impl<T> Array1<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn from_vec(data: Vec<T>) -> Self {
        Self::new(data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T> Array1<T>
where
    T: Clone + Zero,
{
    pub fn zeros(len: usize) -> Self {
        Array1::from_vec(vec![T::zero(); len])
    }
}

impl<T: Float> Array1<T> {
    /// `self += alpha * other`
    pub fn scaled_add(&mut self, alpha: T, other: &Array1<T>) {
        assert_eq!(
            self.len(),
            other.len(),
            "scaled_add requires equal length vectors"
        );
        for (a, &b) in self.data.iter_mut().zip(other.iter()) {
            *a = *a + alpha * b;
        }
    }

    pub fn scale(&mut self, factor: T) {
        for v in self.data.iter_mut() {
            *v = *v * factor;
        }
    }
}

/// Dot product over two equal-length slices.
pub fn dot<T: Float>(lhs: &[T], rhs: &[T]) -> T {
    lhs.iter()
        .zip(rhs.iter())
        .fold(T::zero(), |acc, (&a, &b)| acc + a * b)
}

pub fn l2_norm<T: Float>(values: &[T]) -> T {
    values.iter().fold(T::zero(), |acc, &v| acc + v * v).sqrt()
}
