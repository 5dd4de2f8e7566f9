use crate::error::Result;

/// Inference side of a trained policy: maps an observation to a discrete action.
pub trait Predictor<O> {
    /// `deterministic` picks the mode of the action distribution, otherwise an action is sampled.
    fn predict(&self, observation: &O, deterministic: bool) -> Result<usize>;
}

impl<O, P: Predictor<O> + ?Sized> Predictor<O> for &P {
    fn predict(&self, observation: &O, deterministic: bool) -> Result<usize> {
        (**self).predict(observation, deterministic)
    }
}

/// Persisting learned parameters.
pub trait Persist {
    fn save(&self, path: &std::path::Path) -> Result<()>;
    fn load(&mut self, path: &std::path::Path) -> Result<()>;
}

impl<P: Persist + ?Sized> Persist for &mut P {
    fn save(&self, path: &std::path::Path) -> Result<()> {
        (**self).save(path)
    }

    fn load(&mut self, path: &std::path::Path) -> Result<()> {
        (**self).load(path)
    }
}
