use crate::{distribution::CategoricalDistribution, featurizer::Featurizer, sequential::Sequential};
use candle_core::{Device, Tensor};
use candle_nn::Module;
use protrl_core::{Result, policy::Predictor};

/// Actor and critic networks behind a featurizer. Clones share the parameters with the agent
/// that produced them.
#[derive(Debug, Clone)]
pub struct ActorCriticPolicy<F> {
    pub distribution: CategoricalDistribution,
    pub value_net: Sequential,
    pub featurizer: F,
    pub device: Device,
}

impl<F> ActorCriticPolicy<F> {
    pub fn features_tensor(&self, features: &[Vec<f32>]) -> Result<Tensor> {
        let width = features.first().map(|f| f.len()).unwrap_or(0);
        let flat: Vec<f32> = features.iter().flatten().copied().collect();
        Ok(Tensor::from_vec(flat, (features.len(), width), &self.device)?)
    }

    /// Value estimates of a batch of features, `(batch,)`.
    pub fn values(&self, features: &Tensor) -> Result<Tensor> {
        Ok(self.value_net.forward(features)?.squeeze(1)?)
    }

    pub fn values_of(&self, features: &[Vec<f32>]) -> Result<Vec<f32>> {
        if features.is_empty() {
            return Ok(vec![]);
        }
        Ok(self.values(&self.features_tensor(features)?)?.to_vec1()?)
    }

    /// Picks an action for `observation`, returning it with its log probability and the
    /// features it was computed from.
    pub fn act<O>(&self, observation: &O, deterministic: bool) -> Result<(usize, f32, Vec<f32>)>
    where
        F: Featurizer<O>,
    {
        let features = self.featurizer.featurize(observation);
        let (action, logp) = self.distribution.get_action(&features, deterministic)?;
        Ok((action, logp, features))
    }
}

impl<O, F: Featurizer<O>> Predictor<O> for ActorCriticPolicy<F> {
    fn predict(&self, observation: &O, deterministic: bool) -> Result<usize> {
        let (action, _, _) = self.act(observation, deterministic)?;
        Ok(action)
    }
}
