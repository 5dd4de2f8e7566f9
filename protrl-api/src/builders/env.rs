use protrl_core::{
    Result,
    codec::Alphabet,
    env::Env,
    fitness::FitnessScorer,
    mutation::MutationSource,
    protein::protein_target,
};
use protrl_envs::{MutationEnv, MutationEnvConfig, PositionEnv, PositionEnvConfig};
use std::sync::Arc;

pub trait EnvBuilderTrait {
    type Env: Env;

    fn build_env(&self) -> Result<Self::Env>;
}

impl<E: Env, F> EnvBuilderTrait for F
where
    F: Fn() -> Result<E>,
{
    type Env = E;

    fn build_env(&self) -> Result<Self::Env> {
        (self)()
    }
}

/// Mutation environment over the wild type of a protein target.
#[derive(Clone)]
pub struct MutationEnvBuilder {
    pub wild_type: String,
    pub alphabet: Alphabet,
    pub scorer: Option<Arc<dyn FitnessScorer>>,
    pub config: MutationEnvConfig,
}

impl MutationEnvBuilder {
    pub fn for_protein(protein: &str) -> Result<Self> {
        let target = protein_target(protein)?;
        Ok(Self {
            wild_type: target.wild_type.to_owned(),
            alphabet: Alphabet::default(),
            scorer: None,
            config: MutationEnvConfig::default(),
        })
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn FitnessScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_config(mut self, config: MutationEnvConfig) -> Self {
        self.config = config;
        self
    }
}

impl EnvBuilderTrait for MutationEnvBuilder {
    type Env = MutationEnv;

    fn build_env(&self) -> Result<MutationEnv> {
        MutationEnv::new(
            &self.wild_type,
            self.alphabet.clone(),
            self.scorer.clone(),
            self.config,
        )
    }
}

/// Position environment over the wild type of a protein target. The mutation source is consumed
/// by the environment, so the builder produces a single environment.
pub struct PositionEnvBuilder {
    pub wild_type: String,
    pub alphabet: Alphabet,
    pub scorer: Option<Arc<dyn FitnessScorer>>,
    pub config: PositionEnvConfig,
}

impl PositionEnvBuilder {
    pub fn for_protein(protein: &str) -> Result<Self> {
        let target = protein_target(protein)?;
        Ok(Self {
            wild_type: target.wild_type.to_owned(),
            alphabet: Alphabet::default(),
            scorer: None,
            config: PositionEnvConfig::default(),
        })
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn FitnessScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_config(mut self, config: PositionEnvConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build_with_source(&self, source: Box<dyn MutationSource>) -> Result<PositionEnv> {
        PositionEnv::new(
            &self.wild_type,
            self.alphabet.clone(),
            source,
            self.scorer.clone(),
            self.config,
        )
    }
}
