use super::errors::EnvironmentError;

use serde::{Deserialize, Serialize};

/// Demand simulator: the unknown acceptance curve a policy has to learn.
///
/// All variants yield the probability that a customer accepts the offered
/// price. `Linear` coefficient vectors carry the intercept as their first
/// element; the remaining coefficients weight the observed context.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DemandModel {
    Bernoulli {
        probabilities: Vec<f64>,
    },
    Phased {
        phases: Vec<Vec<f64>>,
        phase_len: u64,
    },
    Linear {
        thetas: Vec<Vec<f64>>,
        noise_std: f64,
    },
}

impl DemandModel {
    pub fn bernoulli(probabilities: Vec<f64>) -> Result<Self, EnvironmentError> {
        let model = Self::Bernoulli { probabilities };
        model.validate()?;
        Ok(model)
    }

    pub fn phased(phases: Vec<Vec<f64>>, phase_len: u64) -> Result<Self, EnvironmentError> {
        let model = Self::Phased { phases, phase_len };
        model.validate()?;
        Ok(model)
    }

    pub fn linear(thetas: Vec<Vec<f64>>, noise_std: f64) -> Result<Self, EnvironmentError> {
        let model = Self::Linear { thetas, noise_std };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), EnvironmentError> {
        match self {
            Self::Bernoulli { probabilities } => {
                if probabilities.is_empty() {
                    return Err(EnvironmentError::InvalidConfig(
                        "at least one arm is required".into(),
                    ));
                }
                check_probabilities(probabilities)
            }
            Self::Phased { phases, phase_len } => {
                if *phase_len == 0 {
                    return Err(EnvironmentError::InvalidConfig(
                        "phase_len must be positive".into(),
                    ));
                }
                let n_arms = phases.first().map(Vec::len).unwrap_or(0);
                if n_arms == 0 {
                    return Err(EnvironmentError::InvalidConfig(
                        "at least one phase with one arm is required".into(),
                    ));
                }
                for phase in phases {
                    if phase.len() != n_arms {
                        return Err(EnvironmentError::InvalidConfig(
                            "all phases must cover the same arm set".into(),
                        ));
                    }
                    check_probabilities(phase)?;
                }
                Ok(())
            }
            Self::Linear { thetas, noise_std } => {
                let width = thetas.first().map(Vec::len).unwrap_or(0);
                if width < 2 {
                    return Err(EnvironmentError::InvalidConfig(
                        "linear demand needs an intercept and at least one feature weight".into(),
                    ));
                }
                if thetas.iter().any(|theta| theta.len() != width) {
                    return Err(EnvironmentError::InvalidConfig(
                        "all arms must share the same feature dimension".into(),
                    ));
                }
                if !noise_std.is_finite() || *noise_std < 0.0 {
                    return Err(EnvironmentError::InvalidConfig(
                        "noise_std must be finite and non-negative".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    pub fn n_arms(&self) -> usize {
        match self {
            Self::Bernoulli { probabilities } => probabilities.len(),
            Self::Phased { phases, .. } => phases.first().map(Vec::len).unwrap_or(0),
            Self::Linear { thetas, .. } => thetas.len(),
        }
    }

    /// Dimension of the context observed by policies, if this model is contextual.
    pub fn context_dim(&self) -> Option<usize> {
        match self {
            Self::Linear { thetas, .. } => {
                thetas.first().map(|theta| theta.len().saturating_sub(1))
            }
            _ => None,
        }
    }

    pub fn noise_std(&self) -> f64 {
        match self {
            Self::Linear { noise_std, .. } => *noise_std,
            _ => 0.0,
        }
    }

    /// Expected acceptance probability of `arm` at `round` under `context`.
    pub fn mean(
        &self,
        arm: usize,
        context: Option<&[f64]>,
        round: u64,
    ) -> Result<f64, EnvironmentError> {
        let n_arms = self.n_arms();
        if arm >= n_arms {
            return Err(EnvironmentError::InvalidArm { arm, n_arms });
        }

        match self {
            Self::Bernoulli { probabilities } => Ok(probabilities[arm]),
            Self::Phased { phases, phase_len } => {
                // phases wrap around so one model serves any horizon
                let phase = ((round / phase_len) as usize) % phases.len();
                Ok(phases[phase][arm])
            }
            Self::Linear { thetas, .. } => {
                let theta = &thetas[arm];
                let expected = theta.len().saturating_sub(1);
                let context = context.ok_or(EnvironmentError::InvalidContext {
                    expected,
                    actual: 0,
                })?;
                if context.len() != expected {
                    return Err(EnvironmentError::InvalidContext {
                        expected,
                        actual: context.len(),
                    });
                }

                let mean = theta[0]
                    + theta[1..]
                        .iter()
                        .zip(context.iter())
                        .map(|(w, x)| w * x)
                        .sum::<f64>();
                Ok(mean.clamp(0.0, 1.0))
            }
        }
    }
}

fn check_probabilities(probabilities: &[f64]) -> Result<(), EnvironmentError> {
    if probabilities
        .iter()
        .any(|p| !p.is_finite() || !(0.0..=1.0).contains(p))
    {
        return Err(EnvironmentError::InvalidConfig(
            "acceptance probabilities must lie in [0, 1]".into(),
        ));
    }
    Ok(())
}
