use super::errors::PolicyError;
use crate::rng::MaybeSeededRng;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

// attempts at re-regularizing a degenerate posterior before giving up
const MAX_JITTER_RETRIES: usize = 3;
const CHOL_JITTER: f64 = 1e-8;

/// Per-arm Bayesian linear regression state over augmented features
/// `[1, x]`: ridge design matrix `A = λI + Σ z zᵀ` (flat row-major) and
/// response vector `b = Σ r·z`, giving `θ = A⁻¹ b` and covariance `A⁻¹`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct LinearModel {
    dim: usize,
    regularization: f64,
    a_matrix: Vec<f64>,
    b_vector: Vec<f64>,
    pulls: u64,
}

impl LinearModel {
    fn new(dim: usize, regularization: f64) -> Self {
        let mut a_matrix = vec![0.0; dim * dim];
        for i in 0..dim {
            a_matrix[i * dim + i] = regularization;
        }
        Self {
            dim,
            regularization,
            a_matrix,
            b_vector: vec![0.0; dim],
            pulls: 0,
        }
    }

    fn observe(&mut self, features: &[f64], reward: f64) {
        let d = self.dim;
        for i in 0..d {
            for j in 0..d {
                self.a_matrix[i * d + j] += features[i] * features[j];
            }
        }
        for (b_i, &z_i) in self.b_vector.iter_mut().zip(features.iter()) {
            *b_i += reward * z_i;
        }
        self.pulls += 1;
    }

    /// Posterior covariance `A⁻¹`. A singular design matrix is recovered
    /// in place by re-adding ridge mass to the diagonal; only repeated
    /// failure is surfaced as fatal.
    fn covariance(&self, arm: usize) -> Result<Vec<f64>, PolicyError> {
        if let Some(inverse) = invert_matrix(&self.a_matrix, self.dim) {
            return Ok(inverse);
        }

        let mut regularized = self.a_matrix.clone();
        for attempt in 1..=MAX_JITTER_RETRIES {
            warn!(arm, attempt, "singular design matrix, re-regularizing");
            for i in 0..self.dim {
                regularized[i * self.dim + i] += self.regularization;
            }
            if let Some(inverse) = invert_matrix(&regularized, self.dim) {
                return Ok(inverse);
            }
        }

        Err(PolicyError::NumericalInstability { arm })
    }

    fn theta(&self, covariance: &[f64]) -> Vec<f64> {
        mat_vec_mul(covariance, &self.b_vector, self.dim)
    }
}

fn augment(context: &[f64]) -> Vec<f64> {
    let mut features = Vec::with_capacity(context.len() + 1);
    features.push(1.0);
    features.extend_from_slice(context);
    features
}

fn check_context(context: Option<&[f64]>, expected: usize) -> Result<Vec<f64>, PolicyError> {
    let context = context.ok_or(PolicyError::MissingContext)?;
    if context.len() != expected {
        return Err(PolicyError::InvalidContext {
            expected,
            actual: context.len(),
        });
    }
    Ok(augment(context))
}

fn validate_linear_config(
    n_arms: usize,
    feature_dim: usize,
    regularization: f64,
) -> Result<(), PolicyError> {
    if n_arms == 0 {
        return Err(PolicyError::InvalidConfig(
            "at least one arm is required".into(),
        ));
    }
    if feature_dim == 0 {
        return Err(PolicyError::InvalidConfig(
            "contextual feature dimension must be positive".into(),
        ));
    }
    if !regularization.is_finite() || regularization <= 0.0 {
        return Err(PolicyError::InvalidConfig(
            "regularization strength must be finite and positive".into(),
        ));
    }
    Ok(())
}

/// LinUCB: per-arm confidence ellipsoid score `θ·z + α·sqrt(zᵀ A⁻¹ z)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinUcbPolicy {
    arms: Vec<LinearModel>,
    feature_dim: usize,
    alpha: f64,
}

impl LinUcbPolicy {
    pub fn new(
        n_arms: usize,
        feature_dim: usize,
        regularization: f64,
        alpha: f64,
    ) -> Result<Self, PolicyError> {
        validate_linear_config(n_arms, feature_dim, regularization)?;
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(PolicyError::InvalidConfig(
                "exploration constant must be finite and non-negative".into(),
            ));
        }

        let dim = feature_dim + 1;
        Ok(Self {
            arms: (0..n_arms)
                .map(|_| LinearModel::new(dim, regularization))
                .collect(),
            feature_dim,
            alpha,
        })
    }

    pub fn n_arms(&self) -> usize {
        self.arms.len()
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn select(&self, context: Option<&[f64]>) -> Result<usize, PolicyError> {
        let features = check_context(context, self.feature_dim)?;

        for (arm, model) in self.arms.iter().enumerate() {
            if model.pulls == 0 {
                return Ok(arm);
            }
        }

        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (arm, model) in self.arms.iter().enumerate() {
            let covariance = model.covariance(arm)?;
            let theta = model.theta(&covariance);
            let predicted = dot(&theta, &features);
            let spread = quadratic_form(&covariance, &features, model.dim).max(0.0).sqrt();
            let score = predicted + self.alpha * spread;
            if score > best_score {
                best = arm;
                best_score = score;
            }
        }

        Ok(best)
    }

    pub fn update(
        &mut self,
        arm: usize,
        context: Option<&[f64]>,
        reward: f64,
    ) -> Result<(), PolicyError> {
        let n_arms = self.arms.len();
        if arm >= n_arms {
            return Err(PolicyError::InvalidArm { arm, n_arms });
        }
        let features = check_context(context, self.feature_dim)?;
        self.arms[arm].observe(&features, reward);
        Ok(())
    }
}

/// Contextual Thompson Sampling: per round, sample a weight vector
/// `w ~ N(θ_a, σ² A_a⁻¹)` per arm and pick the highest predicted reward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinThompsonPolicy {
    arms: Vec<LinearModel>,
    feature_dim: usize,
    noise_std: f64,
    rng: MaybeSeededRng,
}

impl LinThompsonPolicy {
    pub fn new(
        n_arms: usize,
        feature_dim: usize,
        regularization: f64,
        noise_std: f64,
        seed: Option<u64>,
    ) -> Result<Self, PolicyError> {
        validate_linear_config(n_arms, feature_dim, regularization)?;
        if !noise_std.is_finite() || noise_std <= 0.0 {
            return Err(PolicyError::InvalidConfig(
                "posterior noise scale must be finite and positive".into(),
            ));
        }

        let dim = feature_dim + 1;
        Ok(Self {
            arms: (0..n_arms)
                .map(|_| LinearModel::new(dim, regularization))
                .collect(),
            feature_dim,
            noise_std,
            rng: MaybeSeededRng::new(seed),
        })
    }

    pub fn n_arms(&self) -> usize {
        self.arms.len()
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn select(&mut self, context: Option<&[f64]>) -> Result<usize, PolicyError> {
        let features = check_context(context, self.feature_dim)?;

        let mut best = 0;
        let mut best_sample = f64::NEG_INFINITY;
        for arm in 0..self.arms.len() {
            let model = &self.arms[arm];
            let covariance = model.covariance(arm)?;
            let theta = model.theta(&covariance);
            let chol = cholesky_with_jitter(&covariance, model.dim, arm)?;

            let z: Vec<f64> = (0..model.dim)
                .map(|_| self.rng.get_rng().sample(StandardNormal))
                .collect();
            // w = θ + σ L z
            let mut weights = theta;
            for (i, w_i) in weights.iter_mut().enumerate() {
                let mut perturbation = 0.0;
                for j in 0..=i {
                    perturbation += chol[i * model.dim + j] * z[j];
                }
                *w_i += self.noise_std * perturbation;
            }

            let sample = dot(&weights, &features);
            if sample > best_sample {
                best = arm;
                best_sample = sample;
            }
        }

        Ok(best)
    }

    pub fn update(
        &mut self,
        arm: usize,
        context: Option<&[f64]>,
        reward: f64,
    ) -> Result<(), PolicyError> {
        let n_arms = self.arms.len();
        if arm >= n_arms {
            return Err(PolicyError::InvalidArm { arm, n_arms });
        }
        let features = check_context(context, self.feature_dim)?;
        self.arms[arm].observe(&features, reward);
        Ok(())
    }
}

fn cholesky_with_jitter(matrix: &[f64], dim: usize, arm: usize) -> Result<Vec<f64>, PolicyError> {
    if let Some(chol) = cholesky(matrix, dim) {
        return Ok(chol);
    }

    let mut jittered = matrix.to_vec();
    for attempt in 1..=MAX_JITTER_RETRIES {
        warn!(arm, attempt, "posterior covariance not positive definite, adding jitter");
        for i in 0..dim {
            jittered[i * dim + i] += CHOL_JITTER * 10f64.powi(attempt as i32);
        }
        if let Some(chol) = cholesky(&jittered, dim) {
            return Ok(chol);
        }
    }

    Err(PolicyError::NumericalInstability { arm })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn mat_vec_mul(matrix: &[f64], vector: &[f64], dim: usize) -> Vec<f64> {
    (0..dim)
        .map(|i| dot(&matrix[i * dim..(i + 1) * dim], vector))
        .collect()
}

fn quadratic_form(matrix: &[f64], vector: &[f64], dim: usize) -> f64 {
    dot(vector, &mat_vec_mul(matrix, vector, dim))
}

/// Gauss-Jordan inversion with partial pivoting; `None` if singular.
fn invert_matrix(matrix: &[f64], dim: usize) -> Option<Vec<f64>> {
    let mut work = matrix.to_vec();
    let mut inverse = vec![0.0; dim * dim];
    for i in 0..dim {
        inverse[i * dim + i] = 1.0;
    }

    for col in 0..dim {
        let pivot_row = (col..dim)
            .max_by(|&a, &b| {
                work[a * dim + col]
                    .abs()
                    .partial_cmp(&work[b * dim + col].abs())
                    .unwrap_or(Ordering::Equal)
            })?;
        let pivot = work[pivot_row * dim + col];
        if pivot.abs() < 1e-12 {
            return None;
        }
        if pivot_row != col {
            for j in 0..dim {
                work.swap(col * dim + j, pivot_row * dim + j);
                inverse.swap(col * dim + j, pivot_row * dim + j);
            }
        }

        let scale = 1.0 / work[col * dim + col];
        for j in 0..dim {
            work[col * dim + j] *= scale;
            inverse[col * dim + j] *= scale;
        }

        for row in 0..dim {
            if row == col {
                continue;
            }
            let factor = work[row * dim + col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..dim {
                work[row * dim + j] -= factor * work[col * dim + j];
                inverse[row * dim + j] -= factor * inverse[col * dim + j];
            }
        }
    }

    Some(inverse)
}

/// Lower-triangular Cholesky factor; `None` if not positive definite.
fn cholesky(matrix: &[f64], dim: usize) -> Option<Vec<f64>> {
    let mut lower = vec![0.0; dim * dim];
    for i in 0..dim {
        for j in 0..=i {
            let mut sum = matrix[i * dim + j];
            for k in 0..j {
                sum -= lower[i * dim + k] * lower[j * dim + k];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                lower[i * dim + j] = sum.sqrt();
            } else {
                lower[i * dim + j] = sum / lower[j * dim + j];
            }
        }
    }
    Some(lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: Option<u64> = Some(1234);

    #[test]
    fn inversion_round_trips() {
        let m = vec![4.0, 1.0, 1.0, 3.0];
        let inv = invert_matrix(&m, 2).unwrap();
        let product = [
            dot(&[m[0], m[1]], &[inv[0], inv[2]]),
            dot(&[m[0], m[1]], &[inv[1], inv[3]]),
            dot(&[m[2], m[3]], &[inv[0], inv[2]]),
            dot(&[m[2], m[3]], &[inv[1], inv[3]]),
        ];
        assert!((product[0] - 1.0).abs() < 1e-10);
        assert!(product[1].abs() < 1e-10);
        assert!(product[2].abs() < 1e-10);
        assert!((product[3] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let m = vec![1.0, 2.0, 2.0, 4.0];
        assert!(invert_matrix(&m, 2).is_none());
    }

    #[test]
    fn cholesky_factor_reconstructs_matrix() {
        let m = vec![4.0, 2.0, 2.0, 3.0];
        let l = cholesky(&m, 2).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let mut sum = 0.0;
                for k in 0..2 {
                    sum += l[i * 2 + k] * l[j * 2 + k];
                }
                assert!((sum - m[i * 2 + j]).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn cholesky_rejects_indefinite_matrix() {
        let m = vec![1.0, 2.0, 2.0, 1.0];
        assert!(cholesky(&m, 2).is_none());
    }

    #[test]
    fn model_recovers_affine_coefficients() {
        let mut model = LinearModel::new(2, 0.01);
        for i in 0..200 {
            let x = (i as f64) / 200.0;
            model.observe(&[1.0, x], 0.2 + 0.1 * x);
        }

        let covariance = model.covariance(0).unwrap();
        let theta = model.theta(&covariance);
        assert!((theta[0] - 0.2).abs() < 0.02);
        assert!((theta[1] - 0.1).abs() < 0.05);
    }

    #[test]
    fn linucb_forces_untried_arms_then_follows_the_context() {
        let mut policy = LinUcbPolicy::new(2, 1, 0.1, 0.1).unwrap();
        assert_eq!(policy.select(Some(&[0.5])).unwrap(), 0);
        policy.update(0, Some(&[0.5]), 0.2).unwrap();
        assert_eq!(policy.select(Some(&[0.5])).unwrap(), 1);
        policy.update(1, Some(&[0.5]), 0.5).unwrap();

        // train towards mu0 = 0.2 + 0.1x, mu1 = 0.9 - 0.8x
        for i in 0..500 {
            let x = (i % 100) as f64 / 100.0;
            policy.update(0, Some(&[x]), 0.2 + 0.1 * x).unwrap();
            policy.update(1, Some(&[x]), 0.9 - 0.8 * x).unwrap();
        }

        assert_eq!(policy.select(Some(&[0.95])).unwrap(), 0);
        assert_eq!(policy.select(Some(&[0.1])).unwrap(), 1);
    }

    #[test]
    fn linear_thompson_follows_the_context_after_training() {
        let mut policy = LinThompsonPolicy::new(2, 1, 0.1, 0.1, SEED).unwrap();
        for i in 0..500 {
            let x = (i % 100) as f64 / 100.0;
            policy.update(0, Some(&[x]), 0.2 + 0.1 * x).unwrap();
            policy.update(1, Some(&[x]), 0.9 - 0.8 * x).unwrap();
        }

        let high: usize = (0..50)
            .filter(|_| policy.select(Some(&[0.95])).unwrap() == 0)
            .count();
        let low: usize = (0..50)
            .filter(|_| policy.select(Some(&[0.1])).unwrap() == 1)
            .count();
        assert!(high >= 45);
        assert!(low >= 45);
    }

    #[test]
    fn context_dimension_is_enforced() {
        let policy = LinUcbPolicy::new(2, 2, 1.0, 1.0).unwrap();
        assert!(matches!(
            policy.select(Some(&[0.5])),
            Err(PolicyError::InvalidContext {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            policy.select(None),
            Err(PolicyError::MissingContext)
        ));
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(LinUcbPolicy::new(0, 1, 1.0, 1.0).is_err());
        assert!(LinUcbPolicy::new(2, 0, 1.0, 1.0).is_err());
        assert!(LinUcbPolicy::new(2, 1, 0.0, 1.0).is_err());
        assert!(LinThompsonPolicy::new(2, 1, 1.0, 0.0, SEED).is_err());
    }
}
