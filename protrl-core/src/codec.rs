use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// The twenty canonical amino acids, in code order.
pub const AMINO_ACIDS: &str = "ARNDCQEGHILKMFPSTWYV";

/// Returned by language-model suggesters when no ranked token is a valid amino acid.
pub const UNKNOWN_SYMBOL: char = 'X';

static AMINO_ACID_ALPHABET: Lazy<Alphabet> = Lazy::new(|| {
    let symbols: Vec<char> = AMINO_ACIDS.chars().collect();
    Alphabet::from_symbols(symbols)
});

/// A bijection between symbols and the integer codes `0..len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<char>,
    codes: HashMap<char, usize>,
}

impl Alphabet {
    pub fn new(symbols: &str) -> Result<Self> {
        let symbols: Vec<char> = symbols.chars().collect();
        if symbols.is_empty() {
            return Err(Error::config("an alphabet needs at least one symbol"));
        }
        let alphabet = Self::from_symbols(symbols);
        if alphabet.codes.len() != alphabet.symbols.len() {
            return Err(Error::config("alphabet symbols must be unique"));
        }
        Ok(alphabet)
    }

    fn from_symbols(symbols: Vec<char>) -> Self {
        let codes = symbols.iter().enumerate().map(|(i, s)| (*s, i)).collect();
        Self { symbols, codes }
    }

    /// The process wide amino acid alphabet.
    pub fn amino_acids() -> &'static Alphabet {
        &AMINO_ACID_ALPHABET
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn symbol(&self, code: usize) -> Option<char> {
        self.symbols.get(code).copied()
    }

    pub fn code(&self, symbol: char) -> Option<usize> {
        self.codes.get(&symbol).copied()
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.codes.contains_key(&symbol)
    }

    pub fn encode(&self, sequence: &str) -> Result<Vec<usize>> {
        sequence
            .chars()
            .enumerate()
            .map(|(index, symbol)| {
                self.code(symbol)
                    .ok_or(Error::UnknownSymbol { symbol, index })
            })
            .collect()
    }

    pub fn decode(&self, codes: &[usize]) -> Result<String> {
        codes
            .iter()
            .map(|code| {
                self.symbol(*code).ok_or(Error::UnknownCode {
                    code: *code,
                    size: self.len(),
                })
            })
            .collect()
    }

    /// Checks that every code of `codes` belongs to the alphabet.
    pub fn validate(&self, codes: &[usize]) -> Result<()> {
        match codes.iter().find(|code| **code >= self.len()) {
            Some(code) => Err(Error::UnknownCode {
                code: *code,
                size: self.len(),
            }),
            None => Ok(()),
        }
    }

    /// Flattened `codes.len() x self.len()` one-hot encoding, row major.
    pub fn one_hot(&self, codes: &[usize]) -> Vec<f32> {
        let size = self.len();
        let mut encoded = vec![0f32; codes.len() * size];
        for (row, code) in codes.iter().enumerate() {
            if *code < size {
                encoded[row * size + code] = 1.;
            }
        }
        encoded
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Alphabet::amino_acids().clone()
    }
}

pub fn encode(sequence: &str) -> Result<Vec<usize>> {
    Alphabet::amino_acids().encode(sequence)
}

pub fn decode(codes: &[usize]) -> Result<String> {
    Alphabet::amino_acids().decode(codes)
}
