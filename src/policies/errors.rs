use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Arm {arm} outside the configured set of {n_arms} arms")]
    InvalidArm { arm: usize, n_arms: usize },
    #[error("Context dimension mismatch: expected {expected}, got {actual}")]
    InvalidContext { expected: usize, actual: usize },
    #[error("Policy expected a context but none was provided")]
    MissingContext,
    #[error("Invalid policy configuration: {0}")]
    InvalidConfig(String),
    #[error("Posterior sampling failed for arm {arm}: {reason}")]
    Sampling { arm: usize, reason: String },
    #[error("Posterior covariance for arm {arm} is not positive definite")]
    NumericalInstability { arm: usize },
}
