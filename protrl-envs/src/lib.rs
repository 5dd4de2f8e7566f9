pub mod mutation_env;
pub mod position_env;

pub use mutation_env::{MutationEnv, MutationEnvConfig};
pub use position_env::{PositionEnv, PositionEnvConfig};

use protrl_core::{
    Error, Result,
    codec::Alphabet,
    env::EnvState,
    fitness::FitnessScorer,
};

/// Fitness of a single encoded sequence. Without a scorer every sequence is worth 0.
pub(crate) fn score_sequence(
    scorer: Option<&dyn FitnessScorer>,
    alphabet: &Alphabet,
    sequence: &[usize],
) -> Result<f32> {
    let Some(scorer) = scorer else {
        return Ok(0.);
    };
    let decoded = alphabet.decode(sequence)?;
    scorer
        .score(&[decoded])?
        .first()
        .copied()
        .ok_or_else(|| Error::Oracle("the scorer returned no fitness".to_owned()))
}

pub(crate) fn ensure_running(operation: &'static str, state: EnvState) -> Result<()> {
    match state {
        EnvState::Running => Ok(()),
        state => Err(Error::invalid_transition(operation, state)),
    }
}
