use std::collections::HashMap;

/// Token order of the ESM-2 protein language models.
pub const ESM_VOCAB: [&str; 33] = [
    "<cls>", "<pad>", "<eos>", "<unk>", "L", "A", "G", "V", "S", "E", "R", "T", "I", "D", "P",
    "K", "Q", "N", "F", "Y", "M", "H", "W", "C", "X", "B", "U", "Z", "O", ".", "-", "<null_1>",
    "<mask>",
];

#[derive(Debug, Clone)]
pub struct EsmTokenizer {
    ids: HashMap<&'static str, u32>,
}

impl Default for EsmTokenizer {
    fn default() -> Self {
        let ids = ESM_VOCAB
            .iter()
            .enumerate()
            .map(|(id, token)| (*token, id as u32))
            .collect();
        Self { ids }
    }
}

impl EsmTokenizer {
    pub const CLS: u32 = 0;
    pub const PAD: u32 = 1;
    pub const EOS: u32 = 2;
    pub const UNK: u32 = 3;
    pub const MASK: u32 = 32;

    pub fn vocab_size(&self) -> usize {
        ESM_VOCAB.len()
    }

    pub fn token(&self, id: u32) -> Option<&'static str> {
        ESM_VOCAB.get(id as usize).copied()
    }

    pub fn token_id(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    pub fn symbol_id(&self, symbol: char) -> Option<u32> {
        let mut buffer = [0u8; 4];
        self.token_id(symbol.encode_utf8(&mut buffer))
    }

    /// `<cls>` + one token per residue + `<eos>`. Residues outside of the vocabulary become
    /// `<unk>`, so residue `i` always sits at token `i + 1`.
    pub fn encode(&self, sequence: &str) -> Vec<u32> {
        let mut ids = Vec::with_capacity(sequence.len() + 2);
        ids.push(Self::CLS);
        ids.extend(
            sequence
                .chars()
                .map(|symbol| self.symbol_id(symbol).unwrap_or(Self::UNK)),
        );
        ids.push(Self::EOS);
        ids
    }
}
