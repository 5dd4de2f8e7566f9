pub mod agents;
pub mod callbacks;
pub mod codec;
pub mod env;
pub mod error;
pub mod fitness;
pub mod mutation;
pub mod on_policy_algorithm;
pub mod policy;
pub mod protein;
pub mod rng;
pub mod utils;

pub use error::{Error, Result};

/// A learning algorithm. `OnPolicyAlgorithm` is the only implementor, both policies are trained
/// through it.
pub trait Algorithm {
    fn train(&mut self) -> Result<()>;
}
