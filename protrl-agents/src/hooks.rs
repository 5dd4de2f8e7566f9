use crate::checkpoint::Checkpointer;
use protrl_core::{
    Result,
    agents::Agent,
    on_policy_algorithm::{DefaultOnPolicyAlgorithmHooks, LearningSchedule, OnPolicyAlgorithmHooks},
    policy::Persist,
    utils::rollout_buffer::RolloutBuffer,
};

/// Runs the learning schedule and writes checkpoints after the training phases.
pub struct TrainingHooks<'a> {
    schedule: DefaultOnPolicyAlgorithmHooks,
    checkpointer: Option<&'a mut Checkpointer>,
    timestep: usize,
}

impl<'a> TrainingHooks<'a> {
    pub fn new(learning_schedule: LearningSchedule, checkpointer: Option<&'a mut Checkpointer>) -> Self {
        Self {
            schedule: DefaultOnPolicyAlgorithmHooks::new(learning_schedule),
            checkpointer,
            timestep: 0,
        }
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }
}

impl<A: Agent + Persist> OnPolicyAlgorithmHooks<A> for TrainingHooks<'_> {
    fn init_hook(&mut self) -> Result<bool> {
        Ok(self.schedule.learning_schedule().is_finished())
    }

    fn post_rollout_hook(&mut self, rollouts: &mut [RolloutBuffer<A::State>]) -> Result<bool> {
        self.timestep += rollouts.iter().map(|r| r.len()).sum::<usize>();
        Ok(self.schedule.track_rollout(rollouts))
    }

    fn post_training_hook(&mut self, agent: &A) -> Result<bool> {
        if let Some(checkpointer) = self.checkpointer.as_deref_mut() {
            checkpointer.maybe_save(self.timestep, agent)?;
        }
        Ok(self.schedule.learning_schedule().is_finished())
    }

    fn shutdown_hook(&mut self, _agent: &A) -> Result<()> {
        Ok(())
    }
}
