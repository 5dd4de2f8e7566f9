use candle_core::Device;
use protrl_agents::{MutationPolicy, PPOConfig, PositionPolicy};
use protrl_api::{DesignStep, Designer};
use protrl_core::{
    Error, Result,
    codec::Alphabet,
    env::MutationObservation,
    fitness::FitnessScorer,
    mutation::RandomMutationSource,
    policy::Predictor,
};
use protrl_envs::{MutationEnv, MutationEnvConfig, PositionEnv, PositionEnvConfig};
use std::sync::Arc;

fn count_c(sequences: &[String]) -> Result<Vec<f32>> {
    Ok(sequences
        .iter()
        .map(|s| s.chars().filter(|c| *c == 'C').count() as f32 / s.len() as f32)
        .collect())
}

/// Edits the first residue that is not a C yet.
struct FirstNonC;

impl Predictor<Vec<usize>> for FirstNonC {
    fn predict(&self, sequence: &Vec<usize>, _deterministic: bool) -> Result<usize> {
        Ok(sequence.iter().position(|code| *code != 2).unwrap_or(0))
    }
}

struct Fixed(usize);

impl Predictor<Vec<usize>> for Fixed {
    fn predict(&self, _sequence: &Vec<usize>, _deterministic: bool) -> Result<usize> {
        Ok(self.0)
    }
}

impl Predictor<MutationObservation> for Fixed {
    fn predict(&self, _observation: &MutationObservation, _deterministic: bool) -> Result<usize> {
        Ok(self.0)
    }
}

#[test]
fn design_chains_position_and_residue_choices() -> Result<()> {
    let designer = Designer::new(FirstNonC, Fixed(2), &count_c, Alphabet::new("ABC")?);
    assert_eq!(designer.score("ABAB")?, 0.);
    let trajectory = designer.design("ABAB", 3)?;
    let expected = [
        (0, 'A', "CBAB", 0.25),
        (1, 'B', "CCAB", 0.5),
        (2, 'A', "CCCB", 0.75),
    ];
    assert_eq!(trajectory.len(), 3);
    for (iteration, (step, (position, previous, sequence, fitness))) in
        trajectory.iter().zip(expected).enumerate()
    {
        assert_eq!(
            step,
            &DesignStep {
                iteration,
                position,
                previous,
                residue: 'C',
                sequence: sequence.to_owned(),
                fitness,
            }
        );
    }
    Ok(())
}

#[test]
fn out_of_range_positions_are_reported() -> Result<()> {
    let designer = Designer::new(Fixed(4), Fixed(0), &count_c, Alphabet::new("ABC")?);
    assert!(matches!(
        designer.design("ABAB", 1),
        Err(Error::ActionOutOfRange { action: 4, size: 4 })
    ));
    Ok(())
}

#[test]
fn out_of_range_residues_are_reported() -> Result<()> {
    let designer = Designer::new(Fixed(1), Fixed(5), &count_c, Alphabet::new("ABC")?);
    assert!(matches!(
        designer.design("ABAB", 1),
        Err(Error::ActionOutOfRange { action: 5, size: 3 })
    ));
    Ok(())
}

#[test]
fn zero_iterations_leave_an_empty_trajectory() -> Result<()> {
    let designer = Designer::new(Fixed(0), Fixed(0), &count_c, Alphabet::new("ABC")?);
    assert!(designer.design("ABAB", 0)?.is_empty());
    Ok(())
}

#[test]
fn trained_policies_can_be_chained() -> Result<()> {
    let scorer: Arc<dyn FitnessScorer> = Arc::new(count_c);
    let alphabet = Alphabet::new("ABC")?;
    let config = PPOConfig {
        n_steps: 8,
        batch_size: 4,
        n_epochs: 1,
        policy_layers: vec![8],
        value_layers: vec![8],
        ..Default::default()
    };
    let mutation_env = MutationEnv::new(
        "ABCABC",
        alphabet.clone(),
        Some(scorer.clone()),
        MutationEnvConfig {
            max_steps: 4,
            ..Default::default()
        },
    )?;
    let mut mutation = MutationPolicy::for_env(mutation_env, config.clone(), Device::Cpu)?;
    mutation.train(8, &mut (), None)?;

    let position_env = PositionEnv::new(
        "ABCABC",
        alphabet.clone(),
        Box::new(RandomMutationSource::new(alphabet.clone(), 3)),
        Some(scorer.clone()),
        PositionEnvConfig { max_steps: 4 },
    )?;
    let mut position = PositionPolicy::for_env(position_env, config, Device::Cpu)?;
    position.train(8, &mut (), None)?;

    let designer = Designer::new(
        position.inference_policy(alphabet.clone()),
        mutation.mutation_source(),
        scorer.as_ref(),
        alphabet,
    );
    let trajectory = designer.design("ABCABC", 4)?;
    assert_eq!(trajectory.len(), 4);
    let mut previous = "ABCABC".to_owned();
    for step in &trajectory {
        assert!(step.position < 6);
        let changed: Vec<usize> = previous
            .chars()
            .zip(step.sequence.chars())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(idx, _)| idx)
            .collect();
        assert!(changed.is_empty() || changed == vec![step.position]);
        assert_eq!(step.fitness, count_c(&[step.sequence.clone()])?[0]);
        previous = step.sequence.clone();
    }
    Ok(())
}
