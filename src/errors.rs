use crate::env::errors::EnvironmentError;
use crate::policies::errors::PolicyError;

use thiserror::Error;

/// Top-level failure of a simulation run, with the round that broke it.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid simulation configuration: {0}")]
    InvalidConfig(String),
    #[error("Environment failed at round {round}: {source}")]
    Environment {
        round: u64,
        #[source]
        source: EnvironmentError,
    },
    #[error("Policy failed at round {round}: {source}")]
    Policy {
        round: u64,
        #[source]
        source: PolicyError,
    },
}
