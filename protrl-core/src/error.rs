use crate::env::EnvState;
use thiserror::Error;

/// Every failure the pipeline can surface. There is no retry logic anywhere, errors propagate
/// to the caller as they happen.
#[derive(Error, Debug)]
pub enum Error {
    /// The codec was given a character outside of the alphabet
    #[error("unknown symbol {symbol:?} at index {index}")]
    UnknownSymbol { symbol: char, index: usize },

    /// An integer code outside of the alphabet
    #[error("code {code} is outside of an alphabet of size {size}")]
    UnknownCode { code: usize, size: usize },

    /// A lazily initialized resource (oracle, language model) was used before `setup`
    #[error("{0} used before setup")]
    NotInitialized(&'static str),

    /// An environment operation invoked outside of the state that allows it
    #[error("cannot {operation} while the environment is {state:?}")]
    InvalidTransition {
        operation: &'static str,
        state: EnvState,
    },

    /// Persisted weights are missing expected keys after prefix normalization
    #[error("checkpoint format error: {0}")]
    CheckpointFormat(String),

    #[error("action {action} is out of range for a space of size {size}")]
    ActionOutOfRange { action: usize, size: usize },

    #[error("unknown protein identifier {0:?}")]
    UnknownProtein(String),

    #[error("sequence length {actual} does not match the expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("oracle error: {0}")]
    Oracle(String),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn checkpoint(message: impl Into<String>) -> Self {
        Error::CheckpointFormat(message.into())
    }

    pub fn invalid_transition(operation: &'static str, state: EnvState) -> Self {
        Error::InvalidTransition { operation, state }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
