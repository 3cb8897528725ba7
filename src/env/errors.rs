use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("Arm {arm} outside the configured set of {n_arms} arms")]
    InvalidArm { arm: usize, n_arms: usize },
    #[error("Context dimension mismatch: expected {expected}, got {actual}")]
    InvalidContext { expected: usize, actual: usize },
    #[error("Invalid environment configuration: {0}")]
    InvalidConfig(String),
}
