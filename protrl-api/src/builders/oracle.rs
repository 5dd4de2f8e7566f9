use candle_core::Device;
use protrl_core::{Result, fitness::FitnessBounds};
use protrl_oracle::{FitnessOracle, OracleConfig};
use std::{path::PathBuf, sync::Arc};

/// Builds a ready-to-score oracle, shared by every environment of a run.
#[derive(Debug, Clone)]
pub struct OracleBuilder {
    pub config: OracleConfig,
    pub device: Device,
}

impl OracleBuilder {
    pub fn new(checkpoint: impl Into<PathBuf>, protein: impl Into<String>) -> Self {
        Self {
            config: OracleConfig::new(checkpoint, protein),
            device: Device::Cpu,
        }
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn with_bounds(mut self, bounds: FitnessBounds) -> Self {
        self.config.bounds = Some(bounds);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn build(&self) -> Result<Arc<FitnessOracle>> {
        let oracle = FitnessOracle::new(self.config.clone(), self.device.clone())?;
        oracle.setup()?;
        Ok(Arc::new(oracle))
    }
}
