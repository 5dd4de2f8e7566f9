use crate::{masked_lm::MaskedLanguageModel, tokenizer::EsmTokenizer};
use candle_nn::ops::softmax;
use protrl_core::{
    Error, Result,
    codec::{Alphabet, UNKNOWN_SYMBOL},
    mutation::MutationSource,
};

/// Uses a masked language model as a mutation policy: the residue at the asked position is
/// masked and the most likely amino acid the model fills in is proposed.
pub struct PlmSuggester<M> {
    model: M,
    tokenizer: EsmTokenizer,
    alphabet: Alphabet,
}

impl<M: MaskedLanguageModel> PlmSuggester<M> {
    pub fn new(model: M, alphabet: Alphabet) -> Self {
        Self {
            model,
            tokenizer: EsmTokenizer::default(),
            alphabet,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Probabilities over the vocabulary for the masked residue at `position`.
    pub fn masked_probabilities(&self, sequence: &str, position: usize) -> Result<Vec<f32>> {
        let length = sequence.chars().count();
        if position >= length {
            return Err(Error::ActionOutOfRange {
                action: position,
                size: length,
            });
        }
        let mut input_ids = self.tokenizer.encode(sequence);
        input_ids[position + 1] = EsmTokenizer::MASK;
        let logits = self.model.token_logits(&input_ids)?.get(position + 1)?;
        Ok(softmax(&logits, 0)?.to_vec1()?)
    }

    /// `ln(p_mutant / p_wild_type + 1e-8)` of the masked distribution at `position`. An undefined
    /// ratio counts as 0.
    pub fn log_likelihood_ratio(
        &self,
        sequence: &str,
        position: usize,
        mutant: char,
    ) -> Result<f32> {
        let probabilities = self.masked_probabilities(sequence, position)?;
        let wild_type = sequence.chars().nth(position).ok_or(Error::ActionOutOfRange {
            action: position,
            size: sequence.chars().count(),
        })?;
        let probability = |symbol: char, index: usize| -> Result<f32> {
            self.tokenizer
                .symbol_id(symbol)
                .and_then(|id| probabilities.get(id as usize).copied())
                .ok_or(Error::UnknownSymbol { symbol, index })
        };
        let p_wild_type = probability(wild_type, position)?;
        let p_mutant = probability(mutant, position)?;
        let llr = (p_mutant / p_wild_type + 1e-8).ln();
        Ok(if llr.is_nan() { 0. } else { llr })
    }
}

impl<M: MaskedLanguageModel> MutationSource for PlmSuggester<M> {
    fn suggest(&self, sequence: &str, position: usize) -> Result<char> {
        let probabilities = self.masked_probabilities(sequence, position)?;
        let mut ranked: Vec<usize> = (0..probabilities.len()).collect();
        ranked.sort_by(|a, b| probabilities[*b].total_cmp(&probabilities[*a]));
        let suggestion = ranked
            .into_iter()
            .filter_map(|id| self.tokenizer.token(id as u32))
            .filter_map(|token| {
                let mut chars = token.chars();
                match (chars.next(), chars.next()) {
                    (Some(symbol), None) => Some(symbol),
                    _ => None,
                }
            })
            .find(|symbol| self.alphabet.contains(*symbol));
        Ok(suggestion.unwrap_or(UNKNOWN_SYMBOL))
    }
}
