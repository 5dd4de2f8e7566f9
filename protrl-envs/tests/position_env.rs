use protrl_core::{
    Error, Result,
    codec::{Alphabet, UNKNOWN_SYMBOL},
    env::{Env, EnvState},
    fitness::FitnessScorer,
    mutation::{MutationSource, RandomMutationSource},
};
use protrl_envs::{PositionEnv, PositionEnvConfig};
use std::sync::Arc;

/// Always proposes the same symbol.
struct FixedSource(char);

impl MutationSource for FixedSource {
    fn suggest(&self, _sequence: &str, _position: usize) -> Result<char> {
        Ok(self.0)
    }
}

fn length_scorer() -> Arc<dyn FitnessScorer> {
    Arc::new(|sequences: &[String]| -> Result<Vec<f32>> {
        Ok(sequences
            .iter()
            .map(|s| s.chars().filter(|c| *c == 'B').count() as f32)
            .collect())
    })
}

fn abc_env(source: impl MutationSource + 'static, max_steps: usize) -> Result<PositionEnv> {
    PositionEnv::new(
        "ABCABCABCA",
        Alphabet::new("ABC")?,
        Box::new(source),
        Some(length_scorer()),
        PositionEnvConfig { max_steps },
    )
}

#[test]
fn reset_returns_the_wild_type() -> Result<()> {
    let mut env = abc_env(FixedSource('B'), 5)?;
    let observation = env.reset(3)?;
    assert_eq!(observation, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
    env.step(0)?;
    assert_eq!(env.reset(4)?, observation);
    Ok(())
}

#[test]
fn only_the_chosen_position_changes() -> Result<()> {
    let mut env = abc_env(FixedSource('B'), 20)?;
    let mut sequence = env.reset(0)?;
    for position in [9, 0, 4, 2] {
        let snapshot = env.step(position)?;
        for (i, (before, after)) in sequence.iter().zip(snapshot.state.iter()).enumerate() {
            if i == position {
                assert_eq!(*after, 1);
            } else {
                assert_eq!(before, after);
            }
        }
        assert_eq!(snapshot.info.position, position);
        assert_eq!(snapshot.state.len(), 10);
        sequence = snapshot.state;
    }
    Ok(())
}

#[test]
fn reward_scores_the_edited_sequence() -> Result<()> {
    let mut env = abc_env(FixedSource('B'), 20)?;
    env.reset(0)?;
    // "ABCABCABCA" has three Bs, writing a B over the first A makes four
    assert_eq!(env.step(0)?.reward, 4.);
    // a B over a B is a no-op edit
    let snapshot = env.step(1)?;
    assert_eq!(snapshot.reward, 4.);
    assert!(!snapshot.info.changed());
    Ok(())
}

#[test]
fn episode_ends_after_max_steps() -> Result<()> {
    let mut env = abc_env(FixedSource('C'), 3)?;
    env.reset(0)?;
    assert!(!env.step(0)?.done());
    assert!(!env.step(1)?.done());
    assert!(env.step(2)?.done());
    assert_eq!(env.state(), EnvState::Done);
    assert!(matches!(
        env.step(0),
        Err(Error::InvalidTransition {
            state: EnvState::Done,
            ..
        })
    ));
    Ok(())
}

#[test]
fn step_before_reset_is_rejected() -> Result<()> {
    let mut env = abc_env(FixedSource('C'), 3)?;
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
fn unknown_suggestions_surface_as_errors() -> Result<()> {
    let mut env = abc_env(FixedSource(UNKNOWN_SYMBOL), 3)?;
    env.reset(0)?;
    assert!(matches!(
        env.step(4),
        Err(Error::UnknownSymbol {
            symbol: 'X',
            index: 4
        })
    ));
    Ok(())
}

#[test]
fn positions_past_the_end_are_rejected() -> Result<()> {
    let mut env = abc_env(FixedSource('A'), 3)?;
    env.reset(0)?;
    assert!(matches!(
        env.step(10),
        Err(Error::ActionOutOfRange {
            action: 10,
            size: 10
        })
    ));
    Ok(())
}

#[test]
fn random_source_keeps_sequences_in_alphabet() -> Result<()> {
    let alphabet = Alphabet::new("ABC")?;
    let mut env = abc_env(RandomMutationSource::new(alphabet.clone(), 5), 20)?;
    env.reset(0)?;
    for position in 0..10 {
        let snapshot = env.step(position)?;
        alphabet.validate(&snapshot.state)?;
    }
    assert_eq!(env.steps(), 10);
    Ok(())
}

#[test]
fn failed_scoring_leaves_the_episode_untouched() -> Result<()> {
    let scorer: Arc<dyn FitnessScorer> = Arc::new(|_: &[String]| -> Result<Vec<f32>> {
        Err(Error::Oracle("oracle unavailable".into()))
    });
    let mut env = PositionEnv::new(
        "ABCABCABCA",
        Alphabet::new("ABC")?,
        Box::new(FixedSource('C')),
        Some(scorer),
        PositionEnvConfig { max_steps: 2 },
    )?;
    let start = env.reset(0)?;
    for _ in 0..2 {
        assert!(matches!(env.step(3), Err(Error::Oracle(_))));
    }
    assert_eq!(env.steps(), 0);
    assert_eq!(env.sequence(), start.as_slice());
    assert_eq!(env.state(), EnvState::Running);
    Ok(())
}
