use super::accumulator::{AccumulatorSet, ArmStats, Tracking};
use super::errors::PolicyError;
use crate::rng::MaybeSeededRng;

use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-6;

/// Beta-posterior Thompson Sampling. Rewards are normalized by the reward
/// range before entering the posterior, so revenue-valued rewards update
/// it fractionally. Windowed/discounted tracking bounds the posterior's
/// effective sample size, keeping the policy reactive to drift.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThompsonPolicy {
    stats: AccumulatorSet,
    prior_alpha: f64,
    prior_beta: f64,
    reward_range: f64,
    rng: MaybeSeededRng,
    rounds: u64,
}

impl ThompsonPolicy {
    pub fn new(
        n_arms: usize,
        tracking: Tracking,
        prior: (f64, f64),
        reward_range: f64,
        seed: Option<u64>,
    ) -> Result<Self, PolicyError> {
        let (prior_alpha, prior_beta) = prior;
        if prior_alpha <= 0.0 || prior_beta <= 0.0 {
            return Err(PolicyError::InvalidConfig(
                "Beta prior parameters must be positive".into(),
            ));
        }
        if !reward_range.is_finite() || reward_range <= 0.0 {
            return Err(PolicyError::InvalidConfig(
                "reward range must be finite and positive".into(),
            ));
        }

        Ok(Self {
            stats: AccumulatorSet::new(n_arms, tracking)?,
            prior_alpha,
            prior_beta,
            reward_range,
            rng: MaybeSeededRng::new(seed),
            rounds: 0,
        })
    }

    pub fn n_arms(&self) -> usize {
        self.stats.len()
    }

    pub fn arm_stats(&self, arm: usize) -> Result<ArmStats, PolicyError> {
        self.stats.snapshot(arm)
    }

    /// Current Beta posterior of `arm`: (α₀ + successes, β₀ + failures)
    /// on the normalized reward scale.
    pub fn posterior(&self, arm: usize) -> Result<(f64, f64), PolicyError> {
        let snap = self.stats.snapshot(arm)?;
        let alpha = (self.prior_alpha + snap.sum).max(EPS);
        let beta = (self.prior_beta + (snap.count - snap.sum)).max(EPS);
        Ok((alpha, beta))
    }

    pub fn select(&mut self) -> Result<usize, PolicyError> {
        let mut best = 0;
        let mut best_sample = f64::NEG_INFINITY;
        for arm in 0..self.stats.len() {
            let (alpha, beta) = self.posterior(arm)?;
            let sample = Beta::new(alpha, beta)
                .map_err(|e| PolicyError::Sampling {
                    arm,
                    reason: e.to_string(),
                })?
                .sample(self.rng.get_rng());
            if sample > best_sample {
                best = arm;
                best_sample = sample;
            }
        }

        Ok(best)
    }

    pub fn update(&mut self, arm: usize, reward: f64) -> Result<(), PolicyError> {
        self.rounds += 1;
        let normalized = (reward / self.reward_range).clamp(0.0, 1.0);
        self.stats.observe(arm, normalized, self.rounds)
    }
}
