use candle_core::{DType, Device, Tensor};
use candle_nn::{Conv1d, Conv1dConfig, Linear, Module, VarBuilder, conv1d, linear};
use protrl_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameter names the regression CNN is loaded from.
pub const CNN_KEYS: [&str; 6] = [
    "encoder.weight",
    "encoder.bias",
    "embedding.layer.weight",
    "embedding.layer.bias",
    "decoder.weight",
    "decoder.bias",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CnnConfig {
    pub n_tokens: usize,
    pub kernel_size: usize,
    pub hidden_dim: usize,
    /// Zero padding on both ends of the sequence before the encoder convolution
    pub padding: usize,
}

impl Default for CnnConfig {
    fn default() -> Self {
        Self {
            n_tokens: 20,
            kernel_size: 5,
            hidden_dim: 256,
            padding: 2,
        }
    }
}

/// One-hot sequence -> conv encoder -> linear + relu embedding -> max pool over the length ->
/// linear decoder. One raw fitness per sequence.
#[derive(Debug, Clone)]
pub struct FitnessCnn {
    encoder: Conv1d,
    embedding: Linear,
    decoder: Linear,
    config: CnnConfig,
}

impl FitnessCnn {
    pub fn new(config: CnnConfig, vb: VarBuilder) -> Result<Self> {
        let conv_config = Conv1dConfig {
            padding: config.padding,
            ..Default::default()
        };
        let encoder = conv1d(
            config.n_tokens,
            config.hidden_dim,
            config.kernel_size,
            conv_config,
            vb.pp("encoder"),
        )?;
        let embedding = linear(config.hidden_dim, config.hidden_dim, vb.pp("embedding.layer"))?;
        let decoder = linear(config.hidden_dim, 1, vb.pp("decoder"))?;
        Ok(Self {
            encoder,
            embedding,
            decoder,
            config,
        })
    }

    pub fn from_tensors(
        config: CnnConfig,
        tensors: HashMap<String, Tensor>,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_tensors(tensors, DType::F32, device);
        Self::new(config, vb)
    }

    pub fn config(&self) -> &CnnConfig {
        &self.config
    }

    /// `one_hot` is `(batch, length, n_tokens)`, the result `(batch,)`.
    pub fn forward(&self, one_hot: &Tensor) -> Result<Tensor> {
        let xs = one_hot.transpose(1, 2)?.contiguous()?;
        let xs = self.encoder.forward(&xs)?;
        let xs = xs.transpose(1, 2)?.contiguous()?;
        let xs = self.embedding.forward(&xs)?.relu()?;
        let xs = xs.max(1)?;
        Ok(self.decoder.forward(&xs)?.squeeze(1)?)
    }
}
