use candle_core::{Device, Tensor};
use protrl_core::{
    Error, Result,
    codec::{Alphabet, UNKNOWN_SYMBOL},
    mutation::MutationSource,
};
use protrl_oracle::{
    ConvMaskedLm, EsmTokenizer, MaskedLanguageModel, PlmConfig, PlmSuggester,
    tokenizer::ESM_VOCAB,
};
use std::{cell::RefCell, collections::HashMap};

/// Same logits for every token: zero everywhere except for the listed vocabulary entries.
struct StubLm {
    logits: Vec<(&'static str, f32)>,
    seen: RefCell<Vec<u32>>,
}

impl StubLm {
    fn new(logits: Vec<(&'static str, f32)>) -> Self {
        Self {
            logits,
            seen: RefCell::new(vec![]),
        }
    }
}

impl MaskedLanguageModel for StubLm {
    fn token_logits(&self, input_ids: &[u32]) -> Result<Tensor> {
        *self.seen.borrow_mut() = input_ids.to_vec();
        let mut row = vec![0f32; ESM_VOCAB.len()];
        for (token, logit) in self.logits.iter() {
            let id = ESM_VOCAB.iter().position(|t| t == token).unwrap_or(0);
            row[id] = *logit;
        }
        let data: Vec<f32> = (0..input_ids.len()).flat_map(|_| row.clone()).collect();
        Ok(Tensor::from_vec(
            data,
            (input_ids.len(), ESM_VOCAB.len()),
            &Device::Cpu,
        )?)
    }
}

#[test]
fn suggests_the_most_likely_amino_acid() -> Result<()> {
    let lm = StubLm::new(vec![("<cls>", 9.), ("W", 5.), ("A", 1.)]);
    let suggester = PlmSuggester::new(lm, Alphabet::default());
    assert_eq!(suggester.suggest("MKTAYIAK", 3)?, 'W');
    let seen = suggester.model().seen.borrow().clone();
    assert_eq!(seen.len(), 10);
    assert_eq!(seen[4], EsmTokenizer::MASK);
    assert_eq!(seen[0], EsmTokenizer::CLS);
    Ok(())
}

#[test]
fn falls_back_to_the_unknown_symbol() -> Result<()> {
    let lm = StubLm::new(vec![]);
    let suggester = PlmSuggester::new(lm, Alphabet::new("J")?);
    assert_eq!(suggester.suggest("JJJ", 0)?, UNKNOWN_SYMBOL);
    Ok(())
}

#[test]
fn positions_past_the_end_are_rejected() {
    let suggester = PlmSuggester::new(StubLm::new(vec![]), Alphabet::default());
    assert!(matches!(
        suggester.suggest("MKT", 3),
        Err(Error::ActionOutOfRange { action: 3, size: 3 })
    ));
}

#[test]
fn log_likelihood_ratio_compares_mutant_and_wild_type() -> Result<()> {
    let lm = StubLm::new(vec![("W", 2f32.ln())]);
    let suggester = PlmSuggester::new(lm, Alphabet::default());
    let llr = suggester.log_likelihood_ratio("MKTAYIAK", 3, 'W')?;
    assert!((llr - 2f32.ln()).abs() < 1e-4);
    let same = suggester.log_likelihood_ratio("MKTAYIAK", 3, 'A')?;
    assert!(same.abs() < 1e-4);
    Ok(())
}

fn write_masked_lm(name: &str, config: &PlmConfig) -> Result<()> {
    let device = Device::Cpu;
    let (v, h, k) = (config.vocab_size, config.hidden_dim, config.kernel_size);
    let mut tensors = HashMap::new();
    tensors.insert("embed_tokens.weight", Tensor::randn(0f32, 1., (v, h), &device)?);
    tensors.insert("context.weight", Tensor::randn(0f32, 0.3, (h, h, k), &device)?);
    tensors.insert("context.bias", Tensor::zeros(h, candle_core::DType::F32, &device)?);
    tensors.insert("lm_head.weight", Tensor::randn(0f32, 0.3, (v, h), &device)?);
    tensors.insert("lm_head.bias", Tensor::zeros(v, candle_core::DType::F32, &device)?);
    let path = std::env::temp_dir().join(format!("protrl-plm-{}-{name}.safetensors", std::process::id()));
    candle_core::safetensors::save(&tensors, &path)?;
    assert_eq!(path, config.checkpoint);
    Ok(())
}

#[test]
fn conv_masked_lm_loads_lazily() -> Result<()> {
    let path = std::env::temp_dir().join(format!("protrl-plm-{}-lazy.safetensors", std::process::id()));
    let mut config = PlmConfig::new(path);
    config.hidden_dim = 16;
    config.kernel_size = 3;
    write_masked_lm("lazy", &config)?;
    let lm = ConvMaskedLm::new(config, Device::Cpu)?;
    assert!(matches!(
        lm.token_logits(&[0, 4, 2]),
        Err(Error::NotInitialized(_))
    ));
    lm.setup()?;
    let logits = lm.token_logits(&[0, 4, 5, 6, 2])?;
    assert_eq!(logits.dims(), &[5, 33]);

    let suggester = PlmSuggester::new(lm, Alphabet::default());
    let symbol = suggester.suggest("LAG", 1)?;
    assert!(Alphabet::default().contains(symbol));
    Ok(())
}

#[test]
fn even_context_kernels_are_rejected() {
    let mut config = PlmConfig::new("unused.safetensors");
    config.kernel_size = 4;
    assert!(matches!(
        ConvMaskedLm::new(config, Device::Cpu),
        Err(Error::Config(_))
    ));
}
