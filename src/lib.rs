//! Multi-armed bandit simulation for dynamic pricing of parking slots.
//!
//! An environment simulates stochastic customer demand over a finite
//! price grid (stationary, phase-shifting, or context-dependent) and a
//! policy (UCB1 or Thompson Sampling, specialized per regime) learns the
//! demand curve online while a per-round oracle accounts regret.

pub mod env;
pub mod errors;
pub mod experiment;
pub mod policies;
pub mod rng;
pub mod simulation;

pub use env::{DemandModel, Environment, PlayOutcome, RewardKind};
pub use errors::SimulationError;
pub use policies::{Policy, PolicyConfig, PolicyKind, Regime, Tracking};
pub use simulation::{run, RoundRecord};
