mod accumulator;
pub mod errors;
mod linear;
mod policy;
mod thompson;
mod ucb;

pub use accumulator::{AccumulatorSet, ArmStats, Tracking};
pub use linear::{LinThompsonPolicy, LinUcbPolicy};
pub use policy::{Policy, PolicyConfig, PolicyKind, Regime};
pub use thompson::ThompsonPolicy;
pub use ucb::UcbPolicy;
