use super::accumulator::{AccumulatorSet, ArmStats, Tracking};
use super::errors::PolicyError;

use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-9;

/// UCB1: empirical mean plus a confidence radius shrinking with the pull
/// count. Selection is fully deterministic: untried arms are forced first
/// in index order and all ties break to the lowest arm index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UcbPolicy {
    stats: AccumulatorSet,
    exploration: f64,
    rounds: u64,
}

impl UcbPolicy {
    pub fn new(n_arms: usize, tracking: Tracking, exploration: f64) -> Result<Self, PolicyError> {
        if !exploration.is_finite() || exploration < 0.0 {
            return Err(PolicyError::InvalidConfig(
                "exploration constant must be finite and non-negative".into(),
            ));
        }

        Ok(Self {
            stats: AccumulatorSet::new(n_arms, tracking)?,
            exploration,
            rounds: 0,
        })
    }

    pub fn n_arms(&self) -> usize {
        self.stats.len()
    }

    pub fn arm_stats(&self, arm: usize) -> Result<ArmStats, PolicyError> {
        self.stats.snapshot(arm)
    }

    pub fn select(&self) -> Result<usize, PolicyError> {
        for arm in 0..self.stats.len() {
            if self.stats.snapshot(arm)?.pulls == 0 {
                return Ok(arm);
            }
        }

        // ln(min(t, W)) for the windowed variant keeps the radius
        // consistent with the evidence a window can actually hold
        let log_t = self
            .stats
            .effective_horizon(self.rounds.max(1))
            .max(1.0)
            .ln();

        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for arm in 0..self.stats.len() {
            let snap = self.stats.snapshot(arm)?;
            let score = if snap.count > EPS {
                snap.mean + self.exploration * (log_t / snap.count).sqrt()
            } else {
                // all evidence aged out; treat as untried
                f64::INFINITY
            };
            if score > best_score {
                best = arm;
                best_score = score;
            }
        }

        Ok(best)
    }

    pub fn update(&mut self, arm: usize, reward: f64) -> Result<(), PolicyError> {
        self.rounds += 1;
        self.stats.observe(arm, reward, self.rounds)
    }
}
