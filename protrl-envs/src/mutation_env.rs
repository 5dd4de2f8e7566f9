use crate::{ensure_running, score_sequence};
use protrl_core::{
    Error, Result,
    codec::Alphabet,
    env::{
        Env, EnvState, EnvironmentDescription, MutationObservation, SnapShot, Space, StepInfo,
    },
    fitness::FitnessScorer,
    mutation::random_mutation,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationEnvConfig {
    /// Steps per episode
    pub max_steps: usize,
    /// Share of the sequence that may be mutated when an episode starts
    pub mutation_fraction: f32,
}

impl Default for MutationEnvConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            mutation_fraction: 0.3,
        }
    }
}

impl MutationEnvConfig {
    /// Exclusive upper bound of the number of initial mutations. Raised to 2 for sequences too
    /// short for the fraction, so that at least one mutation is always applied.
    pub fn max_mutations(&self, length: usize) -> usize {
        ((length as f32 * self.mutation_fraction).floor() as usize).max(2)
    }
}

/// Each episode starts from a randomly mutated wild type with a fixed target position. The agent
/// decides which residue goes to that position.
pub struct MutationEnv {
    alphabet: Alphabet,
    wild_type: Vec<usize>,
    scorer: Option<Arc<dyn FitnessScorer>>,
    config: MutationEnvConfig,
    rng: StdRng,
    sequence: Vec<usize>,
    position: usize,
    steps: usize,
    initial_mutations: usize,
    state: EnvState,
}

impl MutationEnv {
    pub fn new(
        wild_type: &str,
        alphabet: Alphabet,
        scorer: Option<Arc<dyn FitnessScorer>>,
        config: MutationEnvConfig,
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
            scorer,
            config,
            rng: StdRng::seed_from_u64(0),
            sequence: vec![],
            position: 0,
            steps: 0,
            initial_mutations: 0,
            state: EnvState::Ready,
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn wild_type(&self) -> &[usize] {
        &self.wild_type
    }

    pub fn config(&self) -> &MutationEnvConfig {
        &self.config
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Number of point mutations the current episode started with.
    pub fn initial_mutations(&self) -> usize {
        self.initial_mutations
    }

    /// Starts an episode from an explicit sequence and position instead of a random one.
    pub fn reset_to(&mut self, sequence: Vec<usize>, position: usize) -> Result<MutationObservation> {
        if sequence.len() != self.wild_type.len() {
            return Err(Error::LengthMismatch {
                expected: self.wild_type.len(),
                actual: sequence.len(),
            });
        }
        self.alphabet.validate(&sequence)?;
        if position >= sequence.len() {
            return Err(Error::ActionOutOfRange {
                action: position,
                size: sequence.len(),
            });
        }
        self.initial_mutations = self.mutated_positions(&sequence);
        self.sequence = sequence;
        self.position = position;
        self.steps = 0;
        self.state = EnvState::Running;
        Ok(self.observation())
    }

    fn mutated_positions(&self, sequence: &[usize]) -> usize {
        sequence
            .iter()
            .zip(self.wild_type.iter())
            .filter(|(a, b)| a != b)
            .count()
    }

    fn observation(&self) -> MutationObservation {
        MutationObservation {
            sequence: self.sequence.clone(),
            position: self.position,
        }
    }

    fn calc_reward(&self, sequence: &[usize]) -> Result<f32> {
        score_sequence(self.scorer.as_deref(), &self.alphabet, sequence)
    }
}

impl Env for MutationEnv {
    type Observation = MutationObservation;

    fn reset(&mut self, seed: u64) -> Result<MutationObservation> {
        self.rng = StdRng::seed_from_u64(seed);
        let length = self.wild_type.len();
        let mutations = self
            .rng
            .random_range(1..self.config.max_mutations(length));
        self.sequence =
            random_mutation(&self.wild_type, mutations, self.alphabet.len(), &mut self.rng);
        self.position = self.rng.random_range(0..length);
        self.initial_mutations = self.mutated_positions(&self.sequence);
        self.steps = 0;
        self.state = EnvState::Running;
        debug!(seed, mutations, position = self.position, "mutation env reset");
        Ok(self.observation())
    }

    fn step(&mut self, action: usize) -> Result<SnapShot<MutationObservation>> {
        ensure_running("step", self.state)?;
        if !self.env_description().action_space.contains(action) {
            return Err(Error::ActionOutOfRange {
                action,
                size: self.alphabet.len(),
            });
        }
        let previous = self.sequence[self.position];
        let mut candidate = self.sequence.clone();
        candidate[self.position] = action;
        // nothing is committed unless the candidate could be scored
        let reward = self.calc_reward(&candidate)?;
        self.sequence = candidate;
        self.steps += 1;
        let terminated = self.steps >= self.config.max_steps;
        if terminated {
            self.state = EnvState::Done;
        }
        let info = StepInfo {
            step: self.steps,
            position: self.position,
            previous,
            replacement: action,
        };
        debug!(step = self.steps, position = self.position, action, reward, "mutation env step");
        Ok(SnapShot {
            state: self.observation(),
            reward,
            terminated,
            truncated: false,
            info,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        let length = self.wild_type.len();
        EnvironmentDescription::new(
            Space::Composite(vec![
                Space::MultiDiscrete {
                    n: self.alphabet.len(),
                    len: length,
                },
                Space::Discrete(length),
            ]),
            Space::Discrete(self.alphabet.len()),
        )
    }

    fn state(&self) -> EnvState {
        self.state
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mutation_bound_never_drops_below_two() {
        let config = MutationEnvConfig::default();
        assert_eq!(config.max_mutations(1), 2);
        assert_eq!(config.max_mutations(6), 2);
        assert_eq!(config.max_mutations(10), 3);
        assert_eq!(config.max_mutations(28), 8);
        assert_eq!(config.max_mutations(237), 71);
    }
}
