use crate::sequential::{Sequential, build_sequential};
use candle_core::{Device, Error, Result, Tensor};
use candle_nn::{
    Activation, Module, VarBuilder,
    ops::{log_softmax, softmax},
};
use protrl_core::rng::RNG;
use rand::distr::{Distribution, weighted::WeightedIndex};

/// Discrete action distribution parameterized by an MLP over the features.
#[derive(Clone, Debug)]
pub struct CategoricalDistribution {
    action_size: usize,
    logits: Sequential,
    device: Device,
}

impl CategoricalDistribution {
    pub fn new(action_size: usize, logits: Sequential, device: Device) -> Self {
        Self {
            action_size,
            logits,
            device,
        }
    }

    /// `layers` are the hidden sizes, the output layer of `action_size` is added.
    pub fn build(
        input_dim: usize,
        action_size: usize,
        layers: &[usize],
        activation: Activation,
        vb: &VarBuilder,
        prefix: &str,
    ) -> Result<Self> {
        let sizes: Vec<usize> = layers.iter().copied().chain([action_size]).collect();
        let logits = build_sequential(input_dim, &sizes, activation, vb, prefix)?;
        Ok(Self {
            action_size,
            logits,
            device: vb.device().clone(),
        })
    }

    pub fn action_size(&self) -> usize {
        self.action_size
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Probabilities of a single flattened feature vector.
    pub fn probabilities(&self, features: &[f32]) -> Result<Vec<f32>> {
        let features = Tensor::from_slice(features, (1, features.len()), &self.device)?;
        let logits = self.logits.forward(&features)?;
        softmax(&logits, 1)?.squeeze(0)?.to_vec1()
    }

    /// The mode of the distribution when `deterministic`, a sample otherwise. Returns the action
    /// with its log probability.
    pub fn get_action(&self, features: &[f32], deterministic: bool) -> Result<(usize, f32)> {
        let probs = self.probabilities(features)?;
        let action = if deterministic {
            probs
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(idx, _)| idx)
                .unwrap_or(0)
        } else {
            let distribution = WeightedIndex::new(&probs).map_err(Error::wrap)?;
            RNG.with_borrow_mut(|rng| distribution.sample(rng))
        };
        Ok((action, probs[action].max(f32::MIN_POSITIVE).ln()))
    }

    /// `features` is `(batch, input_dim)`, `actions` `(batch,)` of `u32`.
    pub fn log_probs(&self, features: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let logits = self.logits.forward(features)?;
        let log_probs = log_softmax(&logits, 1)?;
        log_probs.gather(&actions.unsqueeze(1)?, 1)?.squeeze(1)
    }

    pub fn entropy(&self, features: &Tensor) -> Result<Tensor> {
        let logits = self.logits.forward(features)?;
        let log_probs = log_softmax(&logits, 1)?;
        let probs = log_probs.exp()?;
        (probs * log_probs)?.sum(1)?.neg()
    }
}
