use protrl_core::{
    Error, Result,
    codec::Alphabet,
    fitness::FitnessScorer,
    mutation::{MutationSource, random_mutation},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Number of trials
    pub samples: usize,
    /// Random mutations applied to the wild type of every trial
    pub mutations: usize,
    pub seed: u64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            samples: 100,
            mutations: 2,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceReport {
    pub name: String,
    /// Trials where the suggested residue scored strictly above the mutated variant
    pub improvements: usize,
    pub suggestions: Vec<char>,
    pub fitness: Vec<f32>,
}

impl SourceReport {
    pub fn improvement_rate(&self) -> f32 {
        if self.fitness.is_empty() {
            0.
        } else {
            self.improvements as f32 / self.fitness.len() as f32
        }
    }

    pub fn mean_fitness(&self) -> f32 {
        if self.fitness.is_empty() {
            0.
        } else {
            self.fitness.iter().sum::<f32>() / self.fitness.len() as f32
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub positions: Vec<usize>,
    /// Fitness of the mutated variants before any source edited them
    pub baseline: Vec<f32>,
    pub sources: Vec<SourceReport>,
}

impl ComparisonReport {
    pub fn source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|source| source.name == name)
    }
}

fn single_score(scorer: &dyn FitnessScorer, sequence: String) -> Result<f32> {
    scorer
        .score(&[sequence])?
        .first()
        .copied()
        .ok_or_else(|| Error::Oracle("the scorer returned no fitness".to_owned()))
}

/// Every trial draws a position and a variant of the wild type with random mutations, then asks
/// each source for the residue at that position and scores the edited variant.
pub fn compare_sources(
    wild_type: &str,
    alphabet: &Alphabet,
    scorer: &dyn FitnessScorer,
    sources: &[(&str, &dyn MutationSource)],
    config: ComparisonConfig,
) -> Result<ComparisonReport> {
    let wild_type = alphabet.encode(wild_type)?;
    if wild_type.is_empty() {
        return Err(Error::config("the wild type sequence is empty"));
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut report = ComparisonReport {
        sources: sources
            .iter()
            .map(|(name, _)| SourceReport {
                name: (*name).to_owned(),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };
    for sample in 0..config.samples {
        let position = rng.random_range(0..wild_type.len());
        let variant = random_mutation(&wild_type, config.mutations, alphabet.len(), &mut rng);
        let decoded = alphabet.decode(&variant)?;
        let baseline = single_score(scorer, decoded.clone())?;
        for ((_, source), source_report) in sources.iter().zip(report.sources.iter_mut()) {
            let residue = source.suggest(&decoded, position)?;
            let code = alphabet.code(residue).ok_or(Error::UnknownSymbol {
                symbol: residue,
                index: position,
            })?;
            let mut edited = variant.clone();
            edited[position] = code;
            let fitness = single_score(scorer, alphabet.decode(&edited)?)?;
            if fitness > baseline {
                source_report.improvements += 1;
            }
            source_report.suggestions.push(residue);
            source_report.fitness.push(fitness);
        }
        debug!(sample, position, baseline, "comparison trial");
        report.positions.push(position);
        report.baseline.push(baseline);
    }
    for source in report.sources.iter() {
        info!(
            source = %source.name,
            improvements = source.improvements,
            samples = config.samples,
            mean_fitness = source.mean_fitness(),
            "mutation source compared"
        );
    }
    Ok(report)
}
