//! Exact t-SNE (t-distributed Stochastic Neighbor Embedding).
//!
//! O(N²) per iteration, which is fine for the few thousand points an
//! analysis plot holds. Optimization follows the usual two stages: an
//! exploration stage with exaggerated affinities and low momentum, then a
//! refinement stage with the true affinities.

use ndarray::{Array2, ArrayView2, Zip};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Reducer;
use crate::error::{Error, Result};
use crate::tracing::prefix;

const MACHINE_EPSILON: f64 = f64::EPSILON;

/// Iterations spent with exaggerated affinities.
const EXPLORATION_ITERS: usize = 250;
const EXPLORATION_MOMENTUM: f64 = 0.5;
const REFINEMENT_MOMENTUM: f64 = 0.8;

/// Progress is checked (and logged) every this many iterations.
const CHECK_EVERY: usize = 50;
const MAX_ITERS_WITHOUT_PROGRESS: usize = 300;
const MIN_GAIN: f64 = 0.01;

const PERPLEXITY_STEPS: usize = 100;
const PERPLEXITY_TOLERANCE: f64 = 1e-5;

/// Distance used between input vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Squared Euclidean distance
    Euclidean,
    /// 1 - cosine similarity
    Cosine,
}

/// Gradient descent step size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningRate {
    /// `max(N / early_exaggeration / 4, 50)`
    Auto,
    Fixed(f64),
}

/// t-SNE options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsneConfig {
    /// Dimensionality of the output points (default: 2)
    pub n_components: usize,
    /// Seed for the random initial embedding (default: 0)
    pub random_state: u64,
    /// Effective number of neighbors; must be less than the batch size (default: 50)
    pub perplexity: f64,
    pub learning_rate: LearningRate,
    /// Total iteration budget, at least 250 (default: 1000)
    pub n_iter: usize,
    pub metric: Metric,
    /// Affinity multiplier during exploration (default: 12)
    pub early_exaggeration: f64,
    /// Stop once the gradient norm drops below this (default: 1e-7)
    pub min_grad_norm: f64,
}

impl Default for TsneConfig {
    fn default() -> Self {
        Self {
            n_components: 2,
            random_state: 0,
            perplexity: 50.0,
            learning_rate: LearningRate::Auto,
            n_iter: 1000,
            metric: Metric::Cosine,
            early_exaggeration: 12.0,
            min_grad_norm: 1e-7,
        }
    }
}

/// t-SNE reducer.
#[derive(Debug, Clone, Default)]
pub struct Tsne {
    config: TsneConfig,
}

/// Iteration range and momentum of one descent stage.
#[derive(Debug, Clone, Copy)]
struct Stage {
    start: usize,
    end: usize,
    momentum: f64,
}

/// State at the end of a descent stage.
#[derive(Debug, Clone, Copy)]
struct Descent {
    iteration: usize,
    kl_divergence: f64,
}

impl Tsne {
    pub fn new(config: TsneConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TsneConfig {
        &self.config
    }

    fn validate(&self, vectors: ArrayView2<'_, f64>) -> Result<()> {
        let n = vectors.nrows();
        let config = &self.config;

        if n < 2 {
            return Err(Error::invalid(format!(
                "t-SNE needs at least 2 points, got {}",
                n
            )));
        }
        if vectors.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid("t-SNE input contains NaN or infinite values"));
        }
        if config.n_components == 0 {
            return Err(Error::invalid("n_components must be at least 1"));
        }
        if !(config.perplexity > 0.0 && config.perplexity < n as f64) {
            return Err(Error::invalid(format!(
                "perplexity ({}) must be positive and less than the number of points ({})",
                config.perplexity, n
            )));
        }
        if config.n_iter < EXPLORATION_ITERS {
            return Err(Error::invalid(format!(
                "n_iter ({}) must be at least {}",
                config.n_iter, EXPLORATION_ITERS
            )));
        }
        if config.early_exaggeration < 1.0 {
            return Err(Error::invalid(format!(
                "early_exaggeration ({}) must be at least 1",
                config.early_exaggeration
            )));
        }
        if let LearningRate::Fixed(rate) = config.learning_rate {
            if !(rate > 0.0) {
                return Err(Error::invalid(format!(
                    "learning rate ({}) must be positive",
                    rate
                )));
            }
        }
        Ok(())
    }

    fn learning_rate(&self, n_points: usize) -> f64 {
        match self.config.learning_rate {
            LearningRate::Auto => {
                (n_points as f64 / self.config.early_exaggeration / 4.0).max(50.0)
            }
            LearningRate::Fixed(rate) => rate,
        }
    }

    /// Momentum gradient descent with per-coordinate adaptive gains.
    fn descend(
        &self,
        p: &Array2<f64>,
        embedding: &mut Array2<f64>,
        stage: Stage,
        learning_rate: f64,
        mut last: Descent,
    ) -> Result<Descent> {
        let mut update = Array2::<f64>::zeros(embedding.raw_dim());
        let mut gains = Array2::<f64>::ones(embedding.raw_dim());
        let mut best_error = f64::INFINITY;
        let mut best_iter = stage.start;

        for iteration in stage.start..stage.end {
            let (kl, mut grad) = kl_divergence(p, embedding.view(), self.config.n_components);
            if !kl.is_finite() {
                return Err(Error::Reduce(format!(
                    "t-SNE diverged at iteration {}",
                    iteration
                )));
            }

            Zip::from(&mut gains)
                .and(&update)
                .and(&grad)
                .for_each(|gain, &u, &g| {
                    let next = if u * g < 0.0 { *gain + 0.2 } else { *gain * 0.8 };
                    *gain = next.max(MIN_GAIN);
                });
            grad *= &gains;
            update = &update * stage.momentum - &grad * learning_rate;
            *embedding += &update;

            last = Descent {
                iteration,
                kl_divergence: kl,
            };

            if (iteration + 1) % CHECK_EVERY == 0 {
                debug!(
                    "{} t-SNE iteration {}: KL divergence {:.6}",
                    prefix::REDUCE,
                    iteration + 1,
                    kl
                );
                if kl < best_error {
                    best_error = kl;
                    best_iter = iteration;
                } else if iteration - best_iter > MAX_ITERS_WITHOUT_PROGRESS {
                    debug!(
                        "{} t-SNE stopped after {} iterations without progress",
                        prefix::REDUCE,
                        MAX_ITERS_WITHOUT_PROGRESS
                    );
                    break;
                }

                let grad_norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
                if grad_norm <= self.config.min_grad_norm {
                    debug!(
                        "{} t-SNE gradient norm {:.3e} below threshold",
                        prefix::REDUCE,
                        grad_norm
                    );
                    break;
                }
            }
        }

        Ok(last)
    }
}

impl Reducer for Tsne {
    fn name(&self) -> &str {
        "tsne"
    }

    fn reduce(&self, vectors: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.validate(vectors)?;
        let n = vectors.nrows();

        let distances = pairwise_distances(vectors, self.config.metric);
        let mut p = joint_probabilities(&distances, self.config.perplexity);

        let mut rng = StdRng::seed_from_u64(self.config.random_state);
        let mut embedding = Array2::from_shape_fn((n, self.config.n_components), |_| {
            1e-4 * rng.sample::<f64, _>(StandardNormal)
        });
        let learning_rate = self.learning_rate(n);

        let start = Descent {
            iteration: 0,
            kl_divergence: f64::NAN,
        };
        p *= self.config.early_exaggeration;
        let explored = self.descend(
            &p,
            &mut embedding,
            Stage {
                start: 0,
                end: EXPLORATION_ITERS,
                momentum: EXPLORATION_MOMENTUM,
            },
            learning_rate,
            start,
        )?;
        p /= self.config.early_exaggeration;
        let refined = self.descend(
            &p,
            &mut embedding,
            Stage {
                start: explored.iteration + 1,
                end: self.config.n_iter,
                momentum: REFINEMENT_MOMENTUM,
            },
            learning_rate,
            explored,
        )?;

        info!(
            "{} t-SNE done: {} points, {} iterations, KL divergence {:.6}",
            prefix::REDUCE,
            n,
            refined.iteration + 1,
            refined.kl_divergence
        );
        Ok(embedding)
    }
}

/// Symmetric matrix of input distances under `metric`.
///
/// Cosine distance against a zero-magnitude vector is 1.0 (similarity 0).
fn pairwise_distances(vectors: ArrayView2<'_, f64>, metric: Metric) -> Array2<f64> {
    let n = vectors.nrows();
    let norms: Vec<f64> = vectors.outer_iter().map(|row| row.dot(&row).sqrt()).collect();
    let mut distances = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (vectors.row(i), vectors.row(j));
            let d = match metric {
                Metric::Euclidean => a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum(),
                Metric::Cosine => {
                    let denom = norms[i] * norms[j];
                    if denom == 0.0 {
                        1.0
                    } else {
                        (1.0 - a.dot(&b) / denom).max(0.0)
                    }
                }
            };
            distances[[i, j]] = d;
            distances[[j, i]] = d;
        }
    }

    distances
}

/// Joint affinities P: per-row Gaussian bandwidths found by binary search so
/// each conditional distribution has the requested perplexity, then
/// symmetrized and normalized to sum to 1. Diagonal is zero.
fn joint_probabilities(distances: &Array2<f64>, perplexity: f64) -> Array2<f64> {
    let n = distances.nrows();
    let desired_entropy = perplexity.ln();
    let mut conditional = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        let row = distances.row(i);
        let mut beta = 1.0;
        let mut beta_min = f64::NEG_INFINITY;
        let mut beta_max = f64::INFINITY;

        for _ in 0..PERPLEXITY_STEPS {
            let mut sum_p = 0.0;
            for j in 0..n {
                let v = if j == i { 0.0 } else { (-row[j] * beta).exp() };
                conditional[[i, j]] = v;
                sum_p += v;
            }
            if sum_p == 0.0 {
                sum_p = 1e-8;
            }

            let mut weighted = 0.0;
            for j in 0..n {
                conditional[[i, j]] /= sum_p;
                weighted += row[j] * conditional[[i, j]];
            }

            let diff = sum_p.ln() + beta * weighted - desired_entropy;
            if diff.abs() <= PERPLEXITY_TOLERANCE {
                break;
            }

            if diff > 0.0 {
                beta_min = beta;
                beta = if beta_max == f64::INFINITY {
                    beta * 2.0
                } else {
                    (beta + beta_max) / 2.0
                };
            } else {
                beta_max = beta;
                beta = if beta_min == f64::NEG_INFINITY {
                    beta / 2.0
                } else {
                    (beta + beta_min) / 2.0
                };
            }
        }
    }

    let mut joint = &conditional + &conditional.t();
    let total = joint.sum().max(MACHINE_EPSILON);
    joint.mapv_inplace(|v| (v / total).max(MACHINE_EPSILON));
    joint.diag_mut().fill(0.0);
    joint
}

/// KL(P || Q) and its gradient with respect to the embedding, using a
/// Student-t kernel with `max(n_components - 1, 1)` degrees of freedom.
fn kl_divergence(
    p: &Array2<f64>,
    embedding: ArrayView2<'_, f64>,
    n_components: usize,
) -> (f64, Array2<f64>) {
    let n = embedding.nrows();
    let dof = n_components.saturating_sub(1).max(1) as f64;
    let exponent = (dof + 1.0) / -2.0;

    let mut kernel = Array2::<f64>::zeros((n, n));
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let sq: f64 = embedding
                .row(i)
                .iter()
                .zip(embedding.row(j).iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            let w = (sq / dof + 1.0).powf(exponent);
            kernel[[i, j]] = w;
            kernel[[j, i]] = w;
            total += 2.0 * w;
        }
    }

    let scale = 2.0 * (dof + 1.0) / dof;
    let mut kl = 0.0;
    let mut grad = Array2::<f64>::zeros(embedding.raw_dim());
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let w = kernel[[i, j]];
            let q = (w / total).max(MACHINE_EPSILON);
            let pij = p[[i, j]];
            kl += pij * (pij.max(MACHINE_EPSILON) / q).ln();

            let coeff = scale * (pij - q) * w;
            for k in 0..embedding.ncols() {
                grad[[i, k]] += coeff * (embedding[[i, k]] - embedding[[j, k]]);
            }
        }
    }

    (kl, grad)
}
