use crate::{
    checkpoint::Checkpointer,
    featurizer::{Featurizer, SequenceFeaturizer, SequencePositionFeaturizer},
    hooks::TrainingHooks,
    policy::ActorCriticPolicy,
    ppo::{PPO, PPOConfig},
    sampler::EnvSampler,
};
use candle_core::Device;
use protrl_core::{
    Algorithm, Error, Result,
    callbacks::TrainingCallback,
    codec::Alphabet,
    env::{Env, MutationObservation, SequenceView},
    mutation::MutationSource,
    on_policy_algorithm::{LearningSchedule, OnPolicyAlgorithm},
    policy::{Persist, Predictor},
};
use protrl_envs::{MutationEnv, PositionEnv};
use std::path::Path;
use tracing::info;

/// A PPO agent bound to the environment it is trained on.
pub struct PolicyAgent<E, F> {
    env: E,
    ppo: PPO<F>,
}

/// Chooses the residue written at a given position.
pub type MutationPolicy = PolicyAgent<MutationEnv, SequencePositionFeaturizer>;

/// Chooses the position to edit.
pub type PositionPolicy = PolicyAgent<PositionEnv, SequenceFeaturizer>;

impl<E, F> PolicyAgent<E, F>
where
    E: Env,
    E::Observation: SequenceView,
    F: Featurizer<E::Observation>,
{
    pub fn new(env: E, featurizer: F, config: PPOConfig, device: Device) -> Result<Self> {
        let action_size = env.env_description().action_size();
        let ppo = PPO::new::<E::Observation>(featurizer, action_size, config, device)?;
        Ok(Self { env, ppo })
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn ppo(&self) -> &PPO<F> {
        &self.ppo
    }

    /// Online PPO against the bound environment. Whole rollouts are collected until at least
    /// `total_steps` environment steps were taken.
    pub fn train(
        &mut self,
        total_steps: usize,
        callbacks: &mut dyn TrainingCallback,
        checkpointer: Option<&mut Checkpointer>,
    ) -> Result<()> {
        callbacks.on_training_start(total_steps)?;
        info!(total_steps, n_steps = self.ppo.config().n_steps, "training started");
        {
            let sampler = EnvSampler::new(&mut self.env, self.ppo.config().n_steps, &mut *callbacks);
            let hooks = TrainingHooks::new(LearningSchedule::total_step_bound(total_steps), checkpointer);
            let mut algo = OnPolicyAlgorithm {
                sampler,
                agent: &mut self.ppo,
                hooks,
            };
            algo.train()?;
        }
        callbacks.on_training_end()?;
        info!("training finished");
        Ok(())
    }

    pub fn predict(&self, observation: &E::Observation, deterministic: bool) -> Result<usize> {
        self.ppo.ppo.policy.predict(observation, deterministic)
    }

    /// An inference handle that shares the weights of this agent.
    pub fn inference_policy(&self, alphabet: Alphabet) -> TrainedPolicy<F> {
        TrainedPolicy {
            policy: self.ppo.ppo.policy.clone(),
            alphabet,
        }
    }
}

impl<E, F> Persist for PolicyAgent<E, F> {
    fn save(&self, path: &Path) -> Result<()> {
        self.ppo.save(path)
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        self.ppo.load(path)
    }
}

impl MutationPolicy {
    pub fn for_env(env: MutationEnv, config: PPOConfig, device: Device) -> Result<Self> {
        let featurizer = SequencePositionFeaturizer {
            alphabet_size: env.alphabet().len(),
            length: env.wild_type().len(),
        };
        Self::new(env, featurizer, config, device)
    }

    pub fn mutation_source(&self) -> TrainedPolicy<SequencePositionFeaturizer> {
        self.inference_policy(self.env.alphabet().clone())
    }
}

impl PositionPolicy {
    pub fn for_env(env: PositionEnv, config: PPOConfig, device: Device) -> Result<Self> {
        let featurizer = SequenceFeaturizer {
            alphabet_size: env.alphabet().len(),
            length: env.wild_type().len(),
        };
        Self::new(env, featurizer, config, device)
    }
}

/// Frozen view of a trained policy, detached from its environment.
#[derive(Debug, Clone)]
pub struct TrainedPolicy<F> {
    policy: ActorCriticPolicy<F>,
    alphabet: Alphabet,
}

impl<F> TrainedPolicy<F> {
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }
}

impl<O, F: Featurizer<O>> Predictor<O> for TrainedPolicy<F> {
    fn predict(&self, observation: &O, deterministic: bool) -> Result<usize> {
        self.policy.predict(observation, deterministic)
    }
}

/// The mutation policy proposes the residue for a position of the position environment. Its
/// argmax residue is always taken, so the environment sees a fixed suggestion per state.
impl MutationSource for TrainedPolicy<SequencePositionFeaturizer> {
    fn suggest(&self, sequence: &str, position: usize) -> Result<char> {
        let observation = MutationObservation {
            sequence: self.alphabet.encode(sequence)?,
            position,
        };
        if position >= observation.sequence.len() {
            return Err(Error::ActionOutOfRange {
                action: position,
                size: observation.sequence.len(),
            });
        }
        let action = self.policy.predict(&observation, true)?;
        self.alphabet.symbol(action).ok_or(Error::UnknownCode {
            code: action,
            size: self.alphabet.len(),
        })
    }
}
