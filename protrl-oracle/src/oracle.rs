use crate::{
    checkpoint::load_checkpoint,
    cnn::{CNN_KEYS, CnnConfig, FitnessCnn},
};
use candle_core::{Device, Tensor};
use once_cell::sync::OnceCell;
use protrl_core::{
    Error, Result,
    codec::Alphabet,
    fitness::{FitnessBounds, FitnessScorer},
    protein::fitness_info,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub checkpoint: PathBuf,
    /// Protein target the normalization bounds are looked up for
    pub protein: String,
    /// Replaces the bounds of the protein table
    pub bounds: Option<FitnessBounds>,
    pub batch_size: usize,
    pub cnn: CnnConfig,
}

impl OracleConfig {
    pub fn new(checkpoint: impl Into<PathBuf>, protein: impl Into<String>) -> Self {
        Self {
            checkpoint: checkpoint.into(),
            protein: protein.into(),
            bounds: None,
            batch_size: 64,
            cnn: CnnConfig::default(),
        }
    }
}

struct LoadedOracle {
    model: FitnessCnn,
    bounds: FitnessBounds,
}

/// Pretrained regression CNN behind the `FitnessScorer` contract. Weights are read on the first
/// `setup`, scoring before that fails.
pub struct FitnessOracle {
    config: OracleConfig,
    alphabet: Alphabet,
    device: Device,
    loaded: OnceCell<LoadedOracle>,
}

impl FitnessOracle {
    pub fn new(config: OracleConfig, device: Device) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(Error::config("the oracle batch size must be at least 1"));
        }
        Ok(Self {
            config,
            alphabet: Alphabet::default(),
            device,
            loaded: OnceCell::new(),
        })
    }

    pub fn with_bounds(mut self, bounds: FitnessBounds) -> Self {
        self.config.bounds = Some(bounds);
        self
    }

    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Loads the checkpoint and the bounds. Calls after the first successful one do nothing.
    pub fn setup(&self) -> Result<()> {
        self.loaded.get_or_try_init(|| {
            let bounds = match self.config.bounds {
                Some(bounds) => bounds,
                None => fitness_info(&self.config.protein)?,
            };
            let tensors = load_checkpoint(&self.config.checkpoint, &self.device, &CNN_KEYS)?;
            let model = FitnessCnn::from_tensors(self.config.cnn, tensors, &self.device)?;
            info!(
                checkpoint = %self.config.checkpoint.display(),
                protein = %self.config.protein,
                min_fitness = bounds.min_fitness,
                max_fitness = bounds.max_fitness,
                "fitness oracle loaded"
            );
            Ok::<_, Error>(LoadedOracle { model, bounds })
        })?;
        Ok(())
    }

    fn loaded(&self) -> Result<&LoadedOracle> {
        self.loaded.get().ok_or(Error::NotInitialized("fitness oracle"))
    }

    pub fn bounds(&self) -> Result<FitnessBounds> {
        Ok(self.loaded()?.bounds)
    }

    /// Model predictions before normalization.
    pub fn raw_fitness(&self, sequences: &[String]) -> Result<Vec<f32>> {
        let loaded = self.loaded()?;
        let mut fitness = Vec::with_capacity(sequences.len());
        for batch in sequences.chunks(self.config.batch_size) {
            let one_hot = self.one_hot_batch(batch)?;
            let predictions: Vec<f32> = loaded.model.forward(&one_hot)?.to_vec1()?;
            fitness.extend(predictions);
        }
        Ok(fitness)
    }

    fn one_hot_batch(&self, batch: &[String]) -> Result<Tensor> {
        let mut length = None;
        let mut data = vec![];
        for sequence in batch {
            let codes = self.alphabet.encode(sequence)?;
            match length {
                None => length = Some(codes.len()),
                Some(expected) if expected != codes.len() => {
                    return Err(Error::LengthMismatch {
                        expected,
                        actual: codes.len(),
                    });
                }
                Some(_) => {}
            }
            data.extend(self.alphabet.one_hot(&codes));
        }
        let length = length.unwrap_or(0);
        Ok(Tensor::from_vec(
            data,
            (batch.len(), length, self.alphabet.len()),
            &self.device,
        )?)
    }
}

impl FitnessScorer for FitnessOracle {
    fn score(&self, sequences: &[String]) -> Result<Vec<f32>> {
        let bounds = self.loaded()?.bounds;
        Ok(bounds.normalize_all(&self.raw_fitness(sequences)?))
    }
}
