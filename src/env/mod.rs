mod demand;
mod environment;
pub mod errors;

pub use demand::DemandModel;
pub use environment::{Environment, PlayOutcome, RewardKind};
