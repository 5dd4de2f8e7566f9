pub mod checkpoint;
pub mod cnn;
pub mod masked_lm;
pub mod oracle;
pub mod plm;
pub mod tokenizer;

pub use cnn::{CnnConfig, FitnessCnn};
pub use masked_lm::{ConvMaskedLm, MaskedLanguageModel, PlmConfig};
pub use oracle::{FitnessOracle, OracleConfig};
pub use plm::PlmSuggester;
pub use tokenizer::EsmTokenizer;
