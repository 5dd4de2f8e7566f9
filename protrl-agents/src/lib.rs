pub mod agent;
pub mod checkpoint;
pub mod distribution;
pub mod featurizer;
pub mod hooks;
pub mod optimizer;
pub mod policy;
pub mod ppo;
pub mod rollout;
pub mod sampler;
pub mod sequential;
pub mod tensors;

pub use agent::{MutationPolicy, PolicyAgent, PositionPolicy, TrainedPolicy};
pub use checkpoint::Checkpointer;
pub use featurizer::{Featurizer, SequenceFeaturizer, SequencePositionFeaturizer};
pub use policy::ActorCriticPolicy;
pub use ppo::{PPO, PPOConfig};
