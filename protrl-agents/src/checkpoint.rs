use protrl_core::{Error, Result, policy::Persist};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes `checkpoint_{counter:04}.safetensors` into a directory every `save_freq` environment
/// steps. The counter starts at 0 and only grows.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    dir: PathBuf,
    save_freq: usize,
    counter: usize,
    last_saved: usize,
}

impl Checkpointer {
    pub fn new(dir: impl Into<PathBuf>, save_freq: usize) -> Result<Self> {
        if save_freq == 0 {
            return Err(Error::config("save_freq must be at least 1"));
        }
        Ok(Self {
            dir: dir.into(),
            save_freq,
            counter: 0,
            last_saved: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn checkpoint_path(&self, counter: usize) -> PathBuf {
        self.dir.join(format!("checkpoint_{counter:04}.safetensors"))
    }

    /// Saves when at least `save_freq` steps passed since the last checkpoint.
    pub fn maybe_save<P: Persist + ?Sized>(
        &mut self,
        timestep: usize,
        model: &P,
    ) -> Result<Option<PathBuf>> {
        if timestep < self.last_saved + self.save_freq {
            return Ok(None);
        }
        std::fs::create_dir_all(&self.dir)?;
        let path = self.checkpoint_path(self.counter);
        model.save(&path)?;
        info!(timestep, path = %path.display(), "checkpoint saved");
        self.counter += 1;
        self.last_saved = timestep;
        Ok(Some(path))
    }

    /// `<dir>/<name>.safetensors`, outside of the numbered sequence.
    pub fn save_final<P: Persist + ?Sized>(&self, name: &str, model: &P) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{name}.safetensors"));
        model.save(&path)?;
        info!(path = %path.display(), "final weights saved");
        Ok(path)
    }
}
