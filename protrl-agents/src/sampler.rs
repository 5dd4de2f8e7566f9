use crate::{featurizer::Featurizer, policy::ActorCriticPolicy};
use protrl_core::{
    Result,
    agents::Sampler,
    callbacks::{EpisodeSummary, StepRecord, TrainingCallback},
    env::{Env, SequenceView},
    rng,
    utils::rollout_buffer::RolloutBuffer,
};

/// Steps a single environment for a fixed number of steps per rollout. Episodes carry over from
/// one rollout to the next; every finished episode resets the environment with a seed drawn from
/// the global rng.
pub struct EnvSampler<'a, E: Env> {
    env: &'a mut E,
    n_steps: usize,
    callbacks: &'a mut dyn TrainingCallback,
    last_observation: Option<E::Observation>,
    episode: EpisodeSummary,
    episodes: usize,
    timestep: usize,
}

impl<'a, E: Env> EnvSampler<'a, E> {
    pub fn new(env: &'a mut E, n_steps: usize, callbacks: &'a mut dyn TrainingCallback) -> Self {
        Self {
            env,
            n_steps,
            callbacks,
            last_observation: None,
            episode: EpisodeSummary::default(),
            episodes: 0,
            timestep: 0,
        }
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }

    pub fn episodes(&self) -> usize {
        self.episodes
    }

    fn reset(&mut self) -> Result<E::Observation> {
        self.episode = EpisodeSummary {
            episode: self.episodes,
            ..Default::default()
        };
        self.env.reset(rng::next_seed())
    }

    fn finish_episode(&mut self) -> Result<()> {
        self.episode.timestep = self.timestep;
        self.callbacks.on_episode_end(&self.episode)?;
        self.episodes += 1;
        Ok(())
    }
}

impl<E, F> Sampler<ActorCriticPolicy<F>> for EnvSampler<'_, E>
where
    E: Env,
    E::Observation: SequenceView,
    F: Featurizer<E::Observation>,
{
    type State = Vec<f32>;

    fn collect_rollouts(
        &mut self,
        policy: &ActorCriticPolicy<F>,
    ) -> Result<Vec<RolloutBuffer<Vec<f32>>>> {
        let mut buffer = RolloutBuffer::default();
        let mut observation = match self.last_observation.take() {
            Some(observation) => observation,
            None => self.reset()?,
        };
        for _ in 0..self.n_steps {
            let (action, logp, features) = policy.act(&observation, false)?;
            let snapshot = self.env.step(action)?;
            self.timestep += 1;
            let done = snapshot.done();
            self.callbacks.on_step(&StepRecord {
                timestep: self.timestep,
                action,
                reward: snapshot.reward,
                done,
                info: &snapshot.info,
                sequence: snapshot.state.sequence(),
            })?;
            self.episode.rewards.push(snapshot.reward);
            self.episode.positions.push(snapshot.info.position);
            self.episode.actions.push(action);
            buffer.push_step(features, action, snapshot.reward, done, logp);
            observation = if done {
                self.finish_episode()?;
                self.reset()?
            } else {
                snapshot.state
            };
        }
        buffer.set_last_state(policy.featurizer.featurize(&observation));
        self.last_observation = Some(observation);
        Ok(vec![buffer])
    }
}
