use crate::{
    Algorithm,
    agents::{Agent, Sampler},
    error::Result,
    utils::rollout_buffer::RolloutBuffer,
};
use tracing::info;

macro_rules! break_on_hook_res {
    ($hook_res:expr) => {
        if $hook_res {
            break;
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningSchedule {
    RolloutBound {
        total_rollouts: usize,
        current_rollout: usize,
    },
    TotalStepBound {
        total_steps: usize,
        current_step: usize,
    },
}

impl LearningSchedule {
    pub fn total_step_bound(total_steps: usize) -> Self {
        Self::TotalStepBound {
            total_steps,
            current_step: 0,
        }
    }

    pub fn rollout_bound(total_rollouts: usize) -> Self {
        Self::RolloutBound {
            total_rollouts,
            current_rollout: 0,
        }
    }

    pub fn record_rollout(&mut self, rollout_steps: usize) {
        match self {
            Self::RolloutBound {
                current_rollout, ..
            } => *current_rollout += 1,
            Self::TotalStepBound { current_step, .. } => *current_step += rollout_steps,
        }
    }

    pub fn is_finished(&self) -> bool {
        match self {
            Self::RolloutBound {
                total_rollouts,
                current_rollout,
            } => current_rollout >= total_rollouts,
            Self::TotalStepBound {
                total_steps,
                current_step,
            } => current_step >= total_steps,
        }
    }
}

/// Extension points of the rollout/learn loop. A `true` returned from a hook ends training.
pub trait OnPolicyAlgorithmHooks<A: Agent> {
    fn init_hook(&mut self) -> Result<bool>;

    fn post_rollout_hook(&mut self, rollouts: &mut [RolloutBuffer<A::State>]) -> Result<bool>;

    fn post_training_hook(&mut self, agent: &A) -> Result<bool>;

    fn shutdown_hook(&mut self, agent: &A) -> Result<()>;
}

/// Follows a learning schedule and logs rollout statistics.
#[derive(Debug, Clone)]
pub struct DefaultOnPolicyAlgorithmHooks {
    rollout_idx: usize,
    learning_schedule: LearningSchedule,
}

impl DefaultOnPolicyAlgorithmHooks {
    pub fn new(learning_schedule: LearningSchedule) -> Self {
        Self {
            rollout_idx: 0,
            learning_schedule,
        }
    }

    pub fn learning_schedule(&self) -> &LearningSchedule {
        &self.learning_schedule
    }

    /// Records a rollout in the schedule. Returns true when it did not contain a single step,
    /// training could not make progress in that case.
    pub fn track_rollout<T: Clone>(&mut self, rollouts: &[RolloutBuffer<T>]) -> bool {
        let total_reward = rollouts
            .iter()
            .map(|s| s.rewards.iter().sum::<f32>())
            .sum::<f32>();
        let episodes: usize = rollouts.iter().map(|s| s.completed_episodes()).sum();
        let rollout_steps: usize = rollouts.iter().map(|s| s.len()).sum();
        let avg_reward = if episodes > 0 {
            total_reward / episodes as f32
        } else {
            0.
        };
        info!(
            rollout = self.rollout_idx,
            steps = rollout_steps,
            episodes,
            total_reward,
            avg_reward,
            "rollout collected"
        );
        self.rollout_idx += 1;
        self.learning_schedule.record_rollout(rollout_steps);
        rollout_steps == 0
    }
}

impl<A: Agent> OnPolicyAlgorithmHooks<A> for DefaultOnPolicyAlgorithmHooks {
    fn init_hook(&mut self) -> Result<bool> {
        Ok(self.learning_schedule.is_finished())
    }

    fn post_rollout_hook(&mut self, rollouts: &mut [RolloutBuffer<A::State>]) -> Result<bool> {
        Ok(self.track_rollout(rollouts))
    }

    fn post_training_hook(&mut self, _agent: &A) -> Result<bool> {
        Ok(self.learning_schedule.is_finished())
    }

    fn shutdown_hook(&mut self, _agent: &A) -> Result<()> {
        Ok(())
    }
}

pub struct OnPolicyAlgorithm<S, A, H> {
    pub sampler: S,
    pub agent: A,
    pub hooks: H,
}

impl<S, A, H> Algorithm for OnPolicyAlgorithm<S, A, H>
where
    A: Agent,
    S: Sampler<A::Policy, State = A::State>,
    H: OnPolicyAlgorithmHooks<A>,
{
    fn train(&mut self) -> Result<()> {
        if self.hooks.init_hook()? {
            return self.hooks.shutdown_hook(&self.agent);
        }
        loop {
            // rollout phase
            let policy = self.agent.policy();
            let mut rollouts = self.sampler.collect_rollouts(&policy)?;
            break_on_hook_res!(self.hooks.post_rollout_hook(&mut rollouts)?);

            // learning phase
            self.agent.learn(rollouts)?;
            break_on_hook_res!(self.hooks.post_training_hook(&self.agent)?);
        }
        self.hooks.shutdown_hook(&self.agent)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct CountingAgent {
        learned_steps: usize,
        learn_calls: usize,
    }

    impl Agent for CountingAgent {
        type Policy = ();
        type State = usize;

        fn policy(&self) -> Self::Policy {}

        fn learn(&mut self, rollouts: Vec<RolloutBuffer<usize>>) -> Result<()> {
            self.learn_calls += 1;
            self.learned_steps += rollouts.iter().map(|r| r.len()).sum::<usize>();
            Ok(())
        }
    }

    struct FixedSampler(usize);

    impl Sampler<()> for FixedSampler {
        type State = usize;

        fn collect_rollouts(&mut self, _policy: &()) -> Result<Vec<RolloutBuffer<usize>>> {
            let mut buffer = RolloutBuffer::default();
            for step in 0..self.0 {
                buffer.push_step(step, 0, 1., false, 0.);
            }
            buffer.set_last_state(self.0);
            Ok(vec![buffer])
        }
    }

    #[test]
    fn step_bound_runs_whole_rollouts() -> Result<()> {
        let mut algo = OnPolicyAlgorithm {
            sampler: FixedSampler(8),
            agent: CountingAgent {
                learned_steps: 0,
                learn_calls: 0,
            },
            hooks: DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::total_step_bound(20)),
        };
        algo.train()?;
        assert_eq!(algo.agent.learn_calls, 3);
        assert_eq!(algo.agent.learned_steps, 24);
        Ok(())
    }

    #[test]
    fn empty_rollouts_stop_training() -> Result<()> {
        let mut algo = OnPolicyAlgorithm {
            sampler: FixedSampler(0),
            agent: CountingAgent {
                learned_steps: 0,
                learn_calls: 0,
            },
            hooks: DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::rollout_bound(5)),
        };
        algo.train()?;
        assert_eq!(algo.agent.learn_calls, 0);
        Ok(())
    }

    #[test]
    fn zero_budget_never_samples() -> Result<()> {
        let mut algo = OnPolicyAlgorithm {
            sampler: FixedSampler(4),
            agent: CountingAgent {
                learned_steps: 0,
                learn_calls: 0,
            },
            hooks: DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::total_step_bound(0)),
        };
        algo.train()?;
        assert_eq!(algo.agent.learn_calls, 0);
        Ok(())
    }
}
