//! Projection onto the left singular vectors of a batch.

use nalgebra::{DMatrix, SVD};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Reducer;
use crate::error::{Error, Result};
use crate::tracing::prefix;

/// SVD options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvdConfig {
    /// Log the singular values after decomposition (default: false)
    pub print_singular_values: bool,
    /// Keep only the first `n` columns of U; `None` keeps all `min(N, D)`
    pub n_components: Option<usize>,
    /// Reject NaN/infinite input before decomposing (default: true)
    pub check_finite: bool,
    /// Convergence tolerance of the implicit-shift iteration
    pub eps: f64,
    /// Iteration cap, 0 for no limit
    pub max_iterations: usize,
}

impl Default for SvdConfig {
    fn default() -> Self {
        Self {
            print_singular_values: false,
            n_components: None,
            check_finite: true,
            eps: f64::EPSILON,
            max_iterations: 0,
        }
    }
}

/// Thin SVD reducer: returns U of `X = U Σ Vᵀ`, columns ordered by
/// descending singular value.
#[derive(Debug, Clone, Default)]
pub struct Svd {
    config: SvdConfig,
}

impl Svd {
    pub fn new(config: SvdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SvdConfig {
        &self.config
    }
}

impl Reducer for Svd {
    fn name(&self) -> &str {
        "svd"
    }

    fn reduce(&self, vectors: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let (n, d) = vectors.dim();
        if n == 0 || d == 0 {
            return Err(Error::invalid(format!("cannot decompose a {}x{} matrix", n, d)));
        }
        if self.config.check_finite && vectors.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid("SVD input contains NaN or infinite values"));
        }
        if self.config.n_components == Some(0) {
            return Err(Error::invalid("n_components must be at least 1"));
        }

        let matrix = DMatrix::from_fn(n, d, |i, j| vectors[[i, j]]);
        let svd = SVD::try_new(
            matrix,
            true,
            false,
            self.config.eps,
            self.config.max_iterations,
        )
        .ok_or_else(|| Error::Reduce(format!("SVD did not converge for {}x{} matrix", n, d)))?;

        info!("{} SVD done: {}x{}", prefix::REDUCE, n, d);
        if self.config.print_singular_values {
            info!(
                "{} singular values: {:?}",
                prefix::REDUCE,
                svd.singular_values.as_slice()
            );
        }

        let u = svd
            .u
            .ok_or_else(|| Error::Reduce("SVD produced no left singular vectors".into()))?;
        let keep = self
            .config
            .n_components
            .map_or(u.ncols(), |k| k.min(u.ncols()));

        Ok(Array2::from_shape_fn((n, keep), |(i, j)| u[(i, j)]))
    }
}
