use crate::{error::Result, utils::rollout_buffer::RolloutBuffer};

pub trait Agent {
    /// Cheap inference handle of the current parameters
    type Policy;
    /// What the policy is fed with
    type State: Clone;

    fn policy(&self) -> Self::Policy;

    /// Instruments learning with the rollout buffers collected
    fn learn(&mut self, rollouts: Vec<RolloutBuffer<Self::State>>) -> Result<()>;
}

impl<A: Agent> Agent for &mut A {
    type Policy = A::Policy;
    type State = A::State;

    fn policy(&self) -> Self::Policy {
        (**self).policy()
    }

    fn learn(&mut self, rollouts: Vec<RolloutBuffer<Self::State>>) -> Result<()> {
        (**self).learn(rollouts)
    }
}

/// Steps an environment with a policy and hands back what happened.
pub trait Sampler<P> {
    type State: Clone;

    fn collect_rollouts(&mut self, policy: &P) -> Result<Vec<RolloutBuffer<Self::State>>>;
}

impl<P, S: Sampler<P>> Sampler<P> for &mut S {
    type State = S::State;

    fn collect_rollouts(&mut self, policy: &P) -> Result<Vec<RolloutBuffer<Self::State>>> {
        (**self).collect_rollouts(policy)
    }
}
