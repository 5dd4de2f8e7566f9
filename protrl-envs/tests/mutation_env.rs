use protrl_core::{
    Error, Result,
    codec::Alphabet,
    env::{Env, EnvState},
    fitness::FitnessScorer,
    protein::protein_target,
};
use protrl_envs::{MutationEnv, MutationEnvConfig};
use std::sync::Arc;

fn count_c_scorer() -> Arc<dyn FitnessScorer> {
    Arc::new(|sequences: &[String]| -> Result<Vec<f32>> {
        Ok(sequences
            .iter()
            .map(|s| s.chars().filter(|c| *c == 'C').count() as f32 / s.len() as f32)
            .collect())
    })
}

fn abc_env(max_steps: usize) -> Result<MutationEnv> {
    MutationEnv::new(
        "ABCABCABCA",
        Alphabet::new("ABC")?,
        Some(count_c_scorer()),
        MutationEnvConfig {
            max_steps,
            ..Default::default()
        },
    )
}

#[test]
fn step_writes_the_action_at_the_observed_position() -> Result<()> {
    let mut env = abc_env(20)?;
    env.reset_to(vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0], 3)?;
    let snapshot = env.step(2)?;
    assert_eq!(snapshot.state.sequence, vec![0, 1, 2, 2, 1, 2, 0, 1, 2, 0]);
    assert_eq!(snapshot.state.position, 3);
    assert!((snapshot.reward - 0.4).abs() < 1e-6);
    assert!(snapshot.info.changed());
    assert!(!snapshot.done());
    Ok(())
}

#[test]
fn step_before_reset_is_rejected() -> Result<()> {
    let mut env = abc_env(20)?;
    assert!(matches!(
        env.step(0),
        Err(Error::InvalidTransition {
            state: EnvState::Ready,
            ..
        })
    ));
    Ok(())
}

#[test]
fn episode_ends_after_max_steps() -> Result<()> {
    let mut env = abc_env(4)?;
    env.reset(11)?;
    for step in 1..=4 {
        let snapshot = env.step(step % 3)?;
        assert_eq!(snapshot.done(), step == 4);
        assert!(!snapshot.truncated);
    }
    assert_eq!(env.state(), EnvState::Done);
    assert!(matches!(env.step(0), Err(Error::InvalidTransition { .. })));
    env.reset(12)?;
    assert_eq!(env.state(), EnvState::Running);
    Ok(())
}

#[test]
fn only_the_observed_position_changes() -> Result<()> {
    let mut env = abc_env(20)?;
    for seed in 0..50 {
        let observation = env.reset(seed)?;
        let action = (seed as usize) % 3;
        let snapshot = env.step(action)?;
        for (i, (before, after)) in observation
            .sequence
            .iter()
            .zip(snapshot.state.sequence.iter())
            .enumerate()
        {
            if i == observation.position {
                assert_eq!(*after, action);
                assert_eq!(before != after, action != *before);
            } else {
                assert_eq!(before, after);
            }
        }
    }
    Ok(())
}

#[test]
fn initial_mutations_stay_in_bounds() -> Result<()> {
    let target = protein_target("AAV")?;
    let mut env = MutationEnv::new(
        target.wild_type,
        Alphabet::default(),
        None,
        MutationEnvConfig::default(),
    )?;
    let upper = (target.bounds.length as f32 * 0.3).floor() as usize;
    for seed in 0..200 {
        let observation = env.reset(seed)?;
        let mutations = env.initial_mutations();
        assert!((1..upper).contains(&mutations));
        let differing = observation
            .sequence
            .iter()
            .zip(env.wild_type().iter())
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(differing, mutations);
        assert!(observation.position < target.bounds.length);
    }
    Ok(())
}

#[test]
fn short_sequences_get_a_single_mutation() -> Result<()> {
    let mut env = MutationEnv::new("ABCA", Alphabet::new("ABC")?, None, Default::default())?;
    for seed in 0..20 {
        env.reset(seed)?;
        assert_eq!(env.initial_mutations(), 1);
    }
    Ok(())
}

#[test]
fn reset_is_reproducible() -> Result<()> {
    let mut env = abc_env(20)?;
    let first = env.reset(42)?;
    let second = env.reset(42)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn missing_scorer_rewards_zero() -> Result<()> {
    let mut env = MutationEnv::new("ABCA", Alphabet::new("ABC")?, None, Default::default())?;
    env.reset(0)?;
    assert_eq!(env.step(1)?.reward, 0.);
    Ok(())
}

#[test]
fn out_of_range_actions_and_start_states_are_rejected() -> Result<()> {
    let mut env = abc_env(20)?;
    assert!(matches!(
        env.reset_to(vec![0, 1], 0),
        Err(Error::LengthMismatch {
            expected: 10,
            actual: 2
        })
    ));
    assert!(matches!(
        env.reset_to(vec![0; 10], 10),
        Err(Error::ActionOutOfRange { .. })
    ));
    assert!(matches!(
        env.reset_to(vec![3; 10], 0),
        Err(Error::UnknownCode { code: 3, size: 3 })
    ));
    env.reset_to(vec![0; 10], 0)?;
    assert!(matches!(
        env.step(3),
        Err(Error::ActionOutOfRange { action: 3, size: 3 })
    ));
    Ok(())
}

#[test]
fn description_matches_the_alphabet() -> Result<()> {
    let env = abc_env(20)?;
    let description = env.env_description();
    assert_eq!(description.action_size(), 3);
    assert_eq!(description.observation_size(), 3 * 10 + 10);
    Ok(())
}

#[test]
fn failed_scoring_leaves_the_episode_untouched() -> Result<()> {
    let scorer: Arc<dyn FitnessScorer> = Arc::new(|_: &[String]| -> Result<Vec<f32>> {
        Err(Error::Oracle("oracle unavailable".into()))
    });
    let mut env = MutationEnv::new(
        "ABCABCABCA",
        Alphabet::new("ABC")?,
        Some(scorer),
        MutationEnvConfig {
            max_steps: 2,
            ..Default::default()
        },
    )?;
    let start = vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0];
    env.reset_to(start.clone(), 3)?;
    for _ in 0..2 {
        assert!(matches!(env.step(2), Err(Error::Oracle(_))));
    }
    assert_eq!(env.steps(), 0);
    assert_eq!(env.sequence(), start.as_slice());
    assert_eq!(env.state(), EnvState::Running);
    Ok(())
}

#[test]
fn untouched_resets_count_no_mutations() -> Result<()> {
    let mut env = MutationEnv::new("AAAA", Alphabet::new("A")?, None, Default::default())?;
    for seed in 0..10 {
        let observation = env.reset(seed)?;
        assert_eq!(observation.sequence, vec![0; 4]);
        assert_eq!(env.initial_mutations(), 0);
    }
    Ok(())
}
