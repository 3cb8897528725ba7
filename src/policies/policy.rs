use super::accumulator::Tracking;
use super::errors::PolicyError;
use super::linear::{LinThompsonPolicy, LinUcbPolicy};
use super::thompson::ThompsonPolicy;
use super::ucb::UcbPolicy;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Ucb1,
    ThompsonSampling,
}

/// Learning regime, mirroring the demand regimes an environment can run.
/// Non-stationary policies must name a window or discount; `Full`
/// tracking there is rejected at construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "regime", rename_all = "snake_case")]
pub enum Regime {
    Stationary,
    NonStationary { tracking: Tracking },
    Contextual { dim: usize, regularization: f64 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub kind: PolicyKind,
    pub regime: Regime,
    pub n_arms: usize,
    /// Width of the reward interval, for exploration-constant defaults
    /// and posterior normalization.
    pub reward_range: f64,
    /// UCB1 confidence constant / LinUCB α. `None` derives range/2.
    pub exploration: Option<f64>,
    /// Beta prior for Thompson Sampling.
    pub prior: (f64, f64),
    /// Posterior noise scale for contextual Thompson Sampling.
    pub noise_std: f64,
    pub seed: Option<u64>,
}

impl PolicyConfig {
    pub fn new(kind: PolicyKind, regime: Regime, n_arms: usize) -> Self {
        Self {
            kind,
            regime,
            n_arms,
            reward_range: 1.0,
            exploration: None,
            prior: (1.0, 1.0),
            noise_std: 0.5,
            seed: None,
        }
    }

    fn exploration(&self) -> f64 {
        self.exploration.unwrap_or(self.reward_range / 2.0)
    }
}

/// Tagged policy over {UCB1, Thompson Sampling} × {stationary,
/// non-stationary, contextual}. Adding a combination is a compile-time
/// extension of this enum rather than a new trait object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Policy {
    Ucb(UcbPolicy),
    Thompson(ThompsonPolicy),
    LinUcb(LinUcbPolicy),
    LinThompson(LinThompsonPolicy),
}

impl Policy {
    pub fn new(config: PolicyConfig) -> Result<Self, PolicyError> {
        if !config.reward_range.is_finite() || config.reward_range <= 0.0 {
            return Err(PolicyError::InvalidConfig(
                "reward range must be finite and positive".into(),
            ));
        }

        let tracking = match config.regime {
            Regime::Stationary => Tracking::Full,
            Regime::NonStationary { tracking } => {
                if tracking == Tracking::Full {
                    return Err(PolicyError::InvalidConfig(
                        "non-stationary regime requires a sliding window or a discount".into(),
                    ));
                }
                tracking
            }
            Regime::Contextual { dim, regularization } => {
                return match config.kind {
                    PolicyKind::Ucb1 => Ok(Self::LinUcb(LinUcbPolicy::new(
                        config.n_arms,
                        dim,
                        regularization,
                        config.exploration(),
                    )?)),
                    PolicyKind::ThompsonSampling => Ok(Self::LinThompson(LinThompsonPolicy::new(
                        config.n_arms,
                        dim,
                        regularization,
                        config.noise_std,
                        config.seed,
                    )?)),
                };
            }
        };

        match config.kind {
            PolicyKind::Ucb1 => Ok(Self::Ucb(UcbPolicy::new(
                config.n_arms,
                tracking,
                config.exploration(),
            )?)),
            PolicyKind::ThompsonSampling => Ok(Self::Thompson(ThompsonPolicy::new(
                config.n_arms,
                tracking,
                config.prior,
                config.reward_range,
                config.seed,
            )?)),
        }
    }

    pub fn n_arms(&self) -> usize {
        match self {
            Self::Ucb(policy) => policy.n_arms(),
            Self::Thompson(policy) => policy.n_arms(),
            Self::LinUcb(policy) => policy.n_arms(),
            Self::LinThompson(policy) => policy.n_arms(),
        }
    }

    /// Context dimension this policy expects; `None` for scalar regimes.
    pub fn context_dim(&self) -> Option<usize> {
        match self {
            Self::Ucb(_) | Self::Thompson(_) => None,
            Self::LinUcb(policy) => Some(policy.feature_dim()),
            Self::LinThompson(policy) => Some(policy.feature_dim()),
        }
    }

    pub fn select(&mut self, context: Option<&[f64]>) -> Result<usize, PolicyError> {
        match self {
            Self::Ucb(policy) => policy.select(),
            Self::Thompson(policy) => policy.select(),
            Self::LinUcb(policy) => policy.select(context),
            Self::LinThompson(policy) => policy.select(context),
        }
    }

    pub fn update(
        &mut self,
        arm: usize,
        context: Option<&[f64]>,
        reward: f64,
    ) -> Result<(), PolicyError> {
        match self {
            Self::Ucb(policy) => policy.update(arm, reward),
            Self::Thompson(policy) => policy.update(arm, reward),
            Self::LinUcb(policy) => policy.update(arm, context, reward),
            Self::LinThompson(policy) => policy.update(arm, context, reward),
        }
    }
}
