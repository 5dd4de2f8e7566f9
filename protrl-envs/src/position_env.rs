use crate::{ensure_running, score_sequence};
use protrl_core::{
    Error, Result,
    codec::Alphabet,
    env::{Env, EnvState, EnvironmentDescription, SnapShot, Space, StepInfo},
    fitness::FitnessScorer,
    mutation::MutationSource,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionEnvConfig {
    pub max_steps: usize,
}

impl Default for PositionEnvConfig {
    fn default() -> Self {
        Self { max_steps: 20 }
    }
}

/// Episodes start from the wild type. The agent picks the position to edit, the residue written
/// there comes from a mutation source.
pub struct PositionEnv {
    alphabet: Alphabet,
    wild_type: Vec<usize>,
    mutation_source: Box<dyn MutationSource>,
    scorer: Option<Arc<dyn FitnessScorer>>,
    config: PositionEnvConfig,
    sequence: Vec<usize>,
    steps: usize,
    state: EnvState,
}

impl PositionEnv {
    pub fn new(
        wild_type: &str,
        alphabet: Alphabet,
        mutation_source: Box<dyn MutationSource>,
        scorer: Option<Arc<dyn FitnessScorer>>,
        config: PositionEnvConfig,
    ) -> Result<Self> {
        let wild_type = alphabet.encode(wild_type)?;
        if wild_type.is_empty() {
            return Err(Error::config("the wild type sequence is empty"));
        }
        if config.max_steps == 0 {
            return Err(Error::config("max_steps must be at least 1"));
        }
        Ok(Self {
            alphabet,
            wild_type,
            mutation_source,
            scorer,
            config,
            sequence: vec![],
            steps: 0,
            state: EnvState::Ready,
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn wild_type(&self) -> &[usize] {
        &self.wild_type
    }

    pub fn config(&self) -> &PositionEnvConfig {
        &self.config
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    fn calc_reward(&self, sequence: &[usize]) -> Result<f32> {
        score_sequence(self.scorer.as_deref(), &self.alphabet, sequence)
    }
}

impl Env for PositionEnv {
    type Observation = Vec<usize>;

    fn reset(&mut self, seed: u64) -> Result<Vec<usize>> {
        self.sequence = self.wild_type.clone();
        self.steps = 0;
        self.state = EnvState::Running;
        debug!(seed, "position env reset");
        Ok(self.sequence.clone())
    }

    fn step(&mut self, action: usize) -> Result<SnapShot<Vec<usize>>> {
        ensure_running("step", self.state)?;
        let length = self.sequence.len();
        if !self.env_description().action_space.contains(action) {
            return Err(Error::ActionOutOfRange {
                action,
                size: length,
            });
        }
        let decoded = self.alphabet.decode(&self.sequence)?;
        let symbol = self.mutation_source.suggest(&decoded, action)?;
        let replacement = self.alphabet.code(symbol).ok_or(Error::UnknownSymbol {
            symbol,
            index: action,
        })?;
        let previous = self.sequence[action];
        let mut candidate = self.sequence.clone();
        candidate[action] = replacement;
        // nothing is committed unless the candidate could be scored
        let reward = self.calc_reward(&candidate)?;
        self.sequence = candidate;
        self.steps += 1;
        let terminated = self.steps >= self.config.max_steps;
        if terminated {
            self.state = EnvState::Done;
        }
        debug!(step = self.steps, position = action, %symbol, reward, "position env step");
        Ok(SnapShot {
            state: self.sequence.clone(),
            reward,
            terminated,
            truncated: false,
            info: StepInfo {
                step: self.steps,
                position: action,
                previous,
                replacement,
            },
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        let length = self.wild_type.len();
        EnvironmentDescription::new(
            Space::MultiDiscrete {
                n: self.alphabet.len(),
                len: length,
            },
            Space::Discrete(length),
        )
    }

    fn state(&self) -> EnvState {
        self.state
    }
}
