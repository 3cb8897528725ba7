use crate::env::Environment;
use crate::errors::SimulationError;
use crate::policies::Policy;

use serde::Serialize;

/// One round of the environment/policy interaction, flat and
/// serializable for external reporting.
#[derive(Clone, Debug, Serialize)]
pub struct RoundRecord {
    pub round: u64,
    pub arm: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<f64>>,
    pub reward: f64,
    pub oracle_reward: f64,
    pub regret: f64,
    pub cumulative_regret: f64,
}

/// Drive `horizon` rounds of environment/policy interaction.
///
/// Instantaneous regret is the oracle's expected reward minus the chosen
/// arm's expected reward, so the cumulative column is monotone even when
/// a lucky draw beats the oracle's expectation.
pub fn run(
    env: &mut Environment,
    policy: &mut Policy,
    horizon: u64,
) -> Result<Vec<RoundRecord>, SimulationError> {
    if horizon == 0 {
        return Err(SimulationError::InvalidConfig(
            "horizon must be positive".into(),
        ));
    }
    if env.n_arms() != policy.n_arms() {
        return Err(SimulationError::InvalidConfig(format!(
            "environment has {} arms but the policy expects {}",
            env.n_arms(),
            policy.n_arms()
        )));
    }
    if env.context_dim() != policy.context_dim() {
        return Err(SimulationError::InvalidConfig(format!(
            "environment context dimension {:?} does not match the policy's {:?}",
            env.context_dim(),
            policy.context_dim()
        )));
    }

    let mut records = Vec::with_capacity(horizon as usize);
    let mut cumulative_regret = 0.0;

    for _ in 0..horizon {
        let round = env.round();
        let context = env.next_context().map(<[f64]>::to_vec);

        let arm = policy
            .select(context.as_deref())
            .map_err(|source| SimulationError::Policy { round, source })?;
        let outcome = env
            .play(arm)
            .map_err(|source| SimulationError::Environment { round, source })?;
        policy
            .update(arm, context.as_deref(), outcome.reward)
            .map_err(|source| SimulationError::Policy { round, source })?;

        let regret = outcome.oracle_reward - outcome.expected_reward;
        cumulative_regret += regret;
        records.push(RoundRecord {
            round,
            arm,
            context,
            reward: outcome.reward,
            oracle_reward: outcome.oracle_reward,
            regret,
            cumulative_regret,
        });
    }

    Ok(records)
}
