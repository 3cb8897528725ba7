use crate::env::{errors::EnvironmentError, DemandModel, Environment, RewardKind};
use crate::policies::{errors::PolicyError, Policy, PolicyConfig, PolicyKind, Regime};

use config::{Config, ConfigError, Environment as EnvOverrides, File};
use serde::Deserialize;

/// Experiment description for the driver binary: which demand curve,
/// which policy, how long, and under which seeds. Loaded from
/// `experiment.{toml,yaml,...}` with `APP_*` environment overrides.
#[derive(Debug, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub horizon: u64,
    #[serde(default = "default_trials")]
    pub n_trials: u64,
    pub seed: u64,
    pub prices: Vec<f64>,
    pub reward_kind: RewardKind,
    pub demand: DemandModel,
    pub policy: PolicySection,
}

#[derive(Debug, Deserialize)]
pub struct PolicySection {
    pub kind: PolicyKind,
    pub regime: Regime,
    pub exploration: Option<f64>,
    pub prior_alpha: Option<f64>,
    pub prior_beta: Option<f64>,
    pub noise_std: Option<f64>,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_trials() -> u64 {
    1
}

impl ExperimentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("experiment"))
            .add_source(EnvOverrides::with_prefix("APP"))
            .build()?;

        builder.try_deserialize()
    }

    /// Environments of different trials advance disjoint seed streams so
    /// trials stay independently reproducible.
    pub fn build_environment(&self, trial: u64) -> Result<Environment, EnvironmentError> {
        let seed = self.seed.wrapping_add(trial.wrapping_mul(2));
        Environment::new(
            self.demand.clone(),
            self.prices.clone(),
            self.reward_kind,
            Some(seed),
        )
    }

    pub fn build_policy(&self, reward_range: f64, trial: u64) -> Result<Policy, PolicyError> {
        let mut config =
            PolicyConfig::new(self.policy.kind, self.policy.regime, self.prices.len());
        config.reward_range = reward_range;
        config.exploration = self.policy.exploration;
        if let Some(alpha) = self.policy.prior_alpha {
            config.prior.0 = alpha;
        }
        if let Some(beta) = self.policy.prior_beta {
            config.prior.1 = beta;
        }
        if let Some(noise_std) = self.policy.noise_std {
            config.noise_std = noise_std;
        }
        config.seed = Some(self.seed.wrapping_add(trial.wrapping_mul(2)).wrapping_add(1));

        Policy::new(config)
    }
}
