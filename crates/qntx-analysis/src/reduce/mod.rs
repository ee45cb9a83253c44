//! Dimensionality reduction backends.
//!
//! A [`Reducer`] maps a batch of `N` vectors (`[N, D]`) to `N` points
//! (`[N, D']`), keeping row `i` of the output paired with row `i` of the
//! input. Two native backends are provided:
//!
//! - [`Tsne`]: exact t-SNE, for non-linear visualization of local structure
//! - [`Svd`]: left singular vectors of the stacked batch
//!
//! Any `Fn(ArrayView2<f64>) -> Result<Array2<f64>>` closure is a reducer too,
//! which is how callers plug in their own projection.

use ndarray::{Array2, ArrayView2};

use crate::error::Result;

pub mod svd;
pub mod tsne;

pub use svd::{Svd, SvdConfig};
pub use tsne::{LearningRate, Metric, Tsne, TsneConfig};

/// Contract for dimensionality reduction backends.
pub trait Reducer {
    /// Short name used in log lines.
    fn name(&self) -> &str {
        "custom"
    }

    /// Reduce `vectors` (`[N, D]`) to `[N, D']` points, preserving row order.
    fn reduce(&self, vectors: ArrayView2<'_, f64>) -> Result<Array2<f64>>;
}

impl<F> Reducer for F
where
    F: Fn(ArrayView2<'_, f64>) -> Result<Array2<f64>>,
{
    fn reduce(&self, vectors: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self(vectors)
    }
}
