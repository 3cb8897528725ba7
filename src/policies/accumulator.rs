use super::errors::PolicyError;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const EPS: f64 = 1e-9;

/// How per-arm evidence ages. Chosen once per policy and never mixed.
///
/// `SlidingWindow` keeps observations from the last `size` rounds;
/// `Discounted` multiplies every arm's statistics by `gamma` each round
/// before the played arm absorbs the new observation, so confidence in
/// unplayed arms decays too.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Tracking {
    Full,
    SlidingWindow { size: u64 },
    Discounted { gamma: f64 },
}

impl Tracking {
    pub fn validate(&self) -> Result<(), PolicyError> {
        match self {
            Self::Full => Ok(()),
            Self::SlidingWindow { size } => {
                if *size == 0 {
                    Err(PolicyError::InvalidConfig(
                        "sliding window size must be positive".into(),
                    ))
                } else {
                    Ok(())
                }
            }
            Self::Discounted { gamma } => {
                if gamma.is_finite() && (0.0..1.0).contains(gamma) && *gamma > 0.0 {
                    Ok(())
                } else {
                    Err(PolicyError::InvalidConfig(
                        "discount factor must lie in (0, 1)".into(),
                    ))
                }
            }
        }
    }
}

/// Read-only view of one arm's sufficient statistics. `count` is the
/// effective sample size, which lags `pulls` under windowing/discounting.
#[derive(Clone, Copy, Debug)]
pub struct ArmStats {
    pub pulls: u64,
    pub count: f64,
    pub sum: f64,
    pub mean: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct ArmAccumulator {
    pulls: u64,
    count: f64,
    sum: f64,
    window: VecDeque<(u64, f64)>,
}

/// Per-arm sufficient statistics for a whole policy, arena-style: one
/// contiguous slot per arm id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccumulatorSet {
    tracking: Tracking,
    arms: Vec<ArmAccumulator>,
}

impl AccumulatorSet {
    pub fn new(n_arms: usize, tracking: Tracking) -> Result<Self, PolicyError> {
        if n_arms == 0 {
            return Err(PolicyError::InvalidConfig(
                "at least one arm is required".into(),
            ));
        }
        tracking.validate()?;

        Ok(Self {
            tracking,
            arms: vec![ArmAccumulator::default(); n_arms],
        })
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    pub fn tracking(&self) -> Tracking {
        self.tracking
    }

    /// Record `reward` for `arm` at round `round` (1-based update clock)
    /// and age every arm's statistics per the tracking strategy.
    pub fn observe(&mut self, arm: usize, reward: f64, round: u64) -> Result<(), PolicyError> {
        let n_arms = self.arms.len();
        if arm >= n_arms {
            return Err(PolicyError::InvalidArm { arm, n_arms });
        }

        match self.tracking {
            Tracking::Full => {
                let slot = &mut self.arms[arm];
                slot.pulls += 1;
                slot.count += 1.0;
                slot.sum += reward;
            }
            Tracking::SlidingWindow { size } => {
                self.arms[arm].pulls += 1;
                self.arms[arm].window.push_back((round, reward));
                let horizon = round.saturating_sub(size);
                for slot in &mut self.arms {
                    while slot.window.front().is_some_and(|(r, _)| *r <= horizon) {
                        slot.window.pop_front();
                    }
                    slot.count = slot.window.len() as f64;
                    slot.sum = slot.window.iter().map(|(_, r)| r).sum();
                }
            }
            Tracking::Discounted { gamma } => {
                for slot in &mut self.arms {
                    slot.count *= gamma;
                    slot.sum *= gamma;
                }
                let slot = &mut self.arms[arm];
                slot.pulls += 1;
                slot.count += 1.0;
                slot.sum += reward;
            }
        }

        Ok(())
    }

    pub fn snapshot(&self, arm: usize) -> Result<ArmStats, PolicyError> {
        let slot = self
            .arms
            .get(arm)
            .ok_or(PolicyError::InvalidArm {
                arm,
                n_arms: self.arms.len(),
            })?;

        let mean = if slot.count > EPS {
            slot.sum / slot.count
        } else {
            0.0
        };

        Ok(ArmStats {
            pulls: slot.pulls,
            count: slot.count,
            sum: slot.sum,
            mean,
        })
    }

    /// Effective number of rounds of evidence available at round `t`,
    /// capped by the tracking strategy's memory.
    pub fn effective_horizon(&self, t: u64) -> f64 {
        match self.tracking {
            Tracking::Full => t as f64,
            Tracking::SlidingWindow { size } => t.min(size) as f64,
            Tracking::Discounted { gamma } => (t as f64).min(1.0 / (1.0 - gamma)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_accumulation_is_order_independent() {
        let mut a = AccumulatorSet::new(2, Tracking::Full).unwrap();
        let mut b = AccumulatorSet::new(2, Tracking::Full).unwrap();

        let updates = [(0, 1.0), (1, 0.0), (0, 0.0), (0, 1.0), (1, 1.0)];
        for (round, (arm, reward)) in updates.iter().enumerate() {
            a.observe(*arm, *reward, round as u64 + 1).unwrap();
        }
        for (round, (arm, reward)) in updates.iter().rev().enumerate() {
            b.observe(*arm, *reward, round as u64 + 1).unwrap();
        }

        for arm in 0..2 {
            let sa = a.snapshot(arm).unwrap();
            let sb = b.snapshot(arm).unwrap();
            assert_eq!(sa.pulls, sb.pulls);
            assert!((sa.mean - sb.mean).abs() < 1e-12);
        }
    }

    #[test]
    fn sliding_window_keeps_recent_rounds_only() {
        let mut stats = AccumulatorSet::new(2, Tracking::SlidingWindow { size: 2 }).unwrap();
        stats.observe(0, 1.0, 1).unwrap();
        stats.observe(0, 0.0, 2).unwrap();
        stats.observe(0, 1.0, 3).unwrap();

        let snap = stats.snapshot(0).unwrap();
        assert_eq!(snap.pulls, 3);
        assert_eq!(snap.count, 2.0);
        assert!((snap.mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn sliding_window_ages_unplayed_arms() {
        let mut stats = AccumulatorSet::new(2, Tracking::SlidingWindow { size: 2 }).unwrap();
        stats.observe(1, 1.0, 1).unwrap();
        stats.observe(0, 1.0, 2).unwrap();
        stats.observe(0, 1.0, 3).unwrap();

        // arm 1's only observation fell out of the window at round 3
        let snap = stats.snapshot(1).unwrap();
        assert_eq!(snap.pulls, 1);
        assert_eq!(snap.count, 0.0);
        assert_eq!(snap.mean, 0.0);
    }

    #[test]
    fn discounted_updates_match_hand_computed_values() {
        let mut stats = AccumulatorSet::new(2, Tracking::Discounted { gamma: 0.5 }).unwrap();
        stats.observe(0, 1.0, 1).unwrap();
        stats.observe(0, 1.0, 2).unwrap();
        stats.observe(0, 0.0, 3).unwrap();

        // counts: 1 -> 1.5 -> 1.75; sums: 1 -> 1.5 -> 0.75
        let snap = stats.snapshot(0).unwrap();
        assert!((snap.count - 1.75).abs() < 1e-12);
        assert!((snap.sum - 0.75).abs() < 1e-12);
        assert!((snap.mean - 3.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn discounting_ages_unplayed_arms() {
        let mut stats = AccumulatorSet::new(2, Tracking::Discounted { gamma: 0.9 }).unwrap();
        stats.observe(1, 1.0, 1).unwrap();
        for round in 2..=50 {
            stats.observe(0, 0.0, round).unwrap();
        }

        let snap = stats.snapshot(1).unwrap();
        assert_eq!(snap.pulls, 1);
        assert!(snap.count < 0.01);
    }

    #[test]
    fn rejects_invalid_tracking_parameters() {
        assert!(AccumulatorSet::new(2, Tracking::SlidingWindow { size: 0 }).is_err());
        assert!(AccumulatorSet::new(2, Tracking::Discounted { gamma: 0.0 }).is_err());
        assert!(AccumulatorSet::new(2, Tracking::Discounted { gamma: 1.0 }).is_err());
        assert!(AccumulatorSet::new(0, Tracking::Full).is_err());
    }

    #[test]
    fn rejects_out_of_range_arm() {
        let mut stats = AccumulatorSet::new(2, Tracking::Full).unwrap();
        assert!(matches!(
            stats.observe(2, 1.0, 1),
            Err(PolicyError::InvalidArm { arm: 2, n_arms: 2 })
        ));
    }
}
