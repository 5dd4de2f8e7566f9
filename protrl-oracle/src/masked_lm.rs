use crate::checkpoint::load_checkpoint;
use candle_core::{DType, Device, Tensor};
use candle_nn::{
    Conv1d, Conv1dConfig, Embedding, Linear, Module, VarBuilder, conv1d, embedding, linear,
};
use once_cell::sync::OnceCell;
use protrl_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Per token logits over the vocabulary of a masked language model.
pub trait MaskedLanguageModel {
    /// `input_ids` of one tokenized sequence in, `(input_ids.len(), vocab_size)` logits out.
    fn token_logits(&self, input_ids: &[u32]) -> Result<Tensor>;
}

impl<M: MaskedLanguageModel + ?Sized> MaskedLanguageModel for &M {
    fn token_logits(&self, input_ids: &[u32]) -> Result<Tensor> {
        (**self).token_logits(input_ids)
    }
}

pub const MASKED_LM_KEYS: [&str; 5] = [
    "embed_tokens.weight",
    "context.weight",
    "context.bias",
    "lm_head.weight",
    "lm_head.bias",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlmConfig {
    pub checkpoint: PathBuf,
    pub vocab_size: usize,
    pub hidden_dim: usize,
    /// Width of the context window around every token, odd
    pub kernel_size: usize,
}

impl PlmConfig {
    pub fn new(checkpoint: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint: checkpoint.into(),
            vocab_size: 33,
            hidden_dim: 64,
            kernel_size: 5,
        }
    }
}

struct ConvMaskedLmModules {
    embed_tokens: Embedding,
    context: Conv1d,
    lm_head: Linear,
}

impl ConvMaskedLmModules {
    fn new(config: &PlmConfig, vb: VarBuilder) -> Result<Self> {
        let embed_tokens = embedding(config.vocab_size, config.hidden_dim, vb.pp("embed_tokens"))?;
        let conv_config = Conv1dConfig {
            padding: config.kernel_size / 2,
            ..Default::default()
        };
        let context = conv1d(
            config.hidden_dim,
            config.hidden_dim,
            config.kernel_size,
            conv_config,
            vb.pp("context"),
        )?;
        let lm_head = linear(config.hidden_dim, config.vocab_size, vb.pp("lm_head"))?;
        Ok(Self {
            embed_tokens,
            context,
            lm_head,
        })
    }
}

/// A small masked language model over the ESM vocabulary: token embeddings, one convolution
/// mixing the neighbourhood of every token and a projection back to the vocabulary.
pub struct ConvMaskedLm {
    config: PlmConfig,
    device: Device,
    modules: OnceCell<ConvMaskedLmModules>,
}

impl ConvMaskedLm {
    pub fn new(config: PlmConfig, device: Device) -> Result<Self> {
        if config.kernel_size % 2 == 0 {
            return Err(Error::config("the context kernel size must be odd"));
        }
        Ok(Self {
            config,
            device,
            modules: OnceCell::new(),
        })
    }

    pub fn setup(&self) -> Result<()> {
        self.modules.get_or_try_init(|| {
            let tensors = load_checkpoint(&self.config.checkpoint, &self.device, &MASKED_LM_KEYS)?;
            let vb = VarBuilder::from_tensors(tensors, DType::F32, &self.device);
            let modules = ConvMaskedLmModules::new(&self.config, vb)?;
            info!(checkpoint = %self.config.checkpoint.display(), "masked language model loaded");
            Ok::<_, Error>(modules)
        })?;
        Ok(())
    }
}

impl MaskedLanguageModel for ConvMaskedLm {
    fn token_logits(&self, input_ids: &[u32]) -> Result<Tensor> {
        let modules = self
            .modules
            .get()
            .ok_or(Error::NotInitialized("masked language model"))?;
        let ids = Tensor::new(input_ids, &self.device)?;
        // (tokens, hidden) -> (1, hidden, tokens)
        let xs = modules.embed_tokens.forward(&ids)?;
        let xs = xs.t()?.contiguous()?.unsqueeze(0)?;
        let xs = modules.context.forward(&xs)?.relu()?;
        let xs = xs.squeeze(0)?.t()?.contiguous()?;
        Ok(modules.lm_head.forward(&xs)?)
    }
}
