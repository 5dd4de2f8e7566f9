use protrl_core::{
    Error, Result,
    codec::Alphabet,
    env::MutationObservation,
    fitness::FitnessScorer,
    policy::Predictor,
};
use serde::Serialize;
use tracing::info;

/// One edit of a design run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignStep {
    pub iteration: usize,
    pub position: usize,
    pub previous: char,
    pub residue: char,
    pub sequence: String,
    pub fitness: f32,
}

/// Chains the two trained policies: the position policy picks where to edit, the mutation policy
/// picks what goes there. Both act deterministically.
pub struct Designer<'a, P, M> {
    position_policy: P,
    mutation_policy: M,
    scorer: &'a dyn FitnessScorer,
    alphabet: Alphabet,
}

impl<'a, P, M> Designer<'a, P, M>
where
    P: Predictor<Vec<usize>>,
    M: Predictor<MutationObservation>,
{
    pub fn new(
        position_policy: P,
        mutation_policy: M,
        scorer: &'a dyn FitnessScorer,
        alphabet: Alphabet,
    ) -> Self {
        Self {
            position_policy,
            mutation_policy,
            scorer,
            alphabet,
        }
    }

    /// Fitness of the starting sequence.
    pub fn score(&self, sequence: &str) -> Result<f32> {
        self.scorer
            .score(&[sequence.to_owned()])?
            .first()
            .copied()
            .ok_or_else(|| Error::Oracle("the scorer returned no fitness".to_owned()))
    }

    pub fn design(&self, start: &str, iterations: usize) -> Result<Vec<DesignStep>> {
        let mut sequence = self.alphabet.encode(start)?;
        info!(iterations, fitness = self.score(start)?, "design started");
        let mut trajectory = Vec::with_capacity(iterations);
        for iteration in 0..iterations {
            let position = self.position_policy.predict(&sequence, true)?;
            if position >= sequence.len() {
                return Err(Error::ActionOutOfRange {
                    action: position,
                    size: sequence.len(),
                });
            }
            let observation = MutationObservation {
                sequence: sequence.clone(),
                position,
            };
            let code = self.mutation_policy.predict(&observation, true)?;
            let (Some(previous), Some(residue)) = (
                self.alphabet.symbol(sequence[position]),
                self.alphabet.symbol(code),
            ) else {
                return Err(Error::ActionOutOfRange {
                    action: code,
                    size: self.alphabet.len(),
                });
            };
            sequence[position] = code;
            let decoded = self.alphabet.decode(&sequence)?;
            let fitness = self.score(&decoded)?;
            info!(iteration, position, %previous, %residue, fitness, "design step");
            trajectory.push(DesignStep {
                iteration,
                position,
                previous,
                residue,
                sequence: decoded,
                fitness,
            });
        }
        Ok(trajectory)
    }
}
