use crate::{env::StepInfo, error::Result};
use serde::Serialize;

/// What a callback gets to see of a single environment step.
#[derive(Debug, Clone, Copy)]
pub struct StepRecord<'a> {
    /// Environment steps taken since the start of training, this one included
    pub timestep: usize,
    pub action: usize,
    pub reward: f32,
    pub done: bool,
    pub info: &'a StepInfo,
    pub sequence: &'a [usize],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub timestep: usize,
    pub rewards: Vec<f32>,
    pub positions: Vec<usize>,
    pub actions: Vec<usize>,
}

impl EpisodeSummary {
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().sum()
    }

    pub fn mean_reward(&self) -> f32 {
        if self.rewards.is_empty() {
            0.
        } else {
            self.total_reward() / self.rewards.len() as f32
        }
    }

    pub fn final_reward(&self) -> Option<f32> {
        self.rewards.last().copied()
    }
}

/// Observer of a training run. Callbacks can not influence the environment or the learning, they
/// only see what happened.
pub trait TrainingCallback {
    fn on_training_start(&mut self, _total_steps: usize) -> Result<()> {
        Ok(())
    }

    fn on_step(&mut self, _step: &StepRecord<'_>) -> Result<()> {
        Ok(())
    }

    fn on_episode_end(&mut self, _episode: &EpisodeSummary) -> Result<()> {
        Ok(())
    }

    fn on_training_end(&mut self) -> Result<()> {
        Ok(())
    }
}

impl TrainingCallback for () {}

#[derive(Default)]
pub struct CallbackList {
    callbacks: Vec<Box<dyn TrainingCallback>>,
}

impl CallbackList {
    pub fn new(callbacks: Vec<Box<dyn TrainingCallback>>) -> Self {
        Self { callbacks }
    }

    pub fn push(&mut self, callback: impl TrainingCallback + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn with(mut self, callback: impl TrainingCallback + 'static) -> Self {
        self.push(callback);
        self
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl TrainingCallback for CallbackList {
    fn on_training_start(&mut self, total_steps: usize) -> Result<()> {
        for callback in self.callbacks.iter_mut() {
            callback.on_training_start(total_steps)?;
        }
        Ok(())
    }

    fn on_step(&mut self, step: &StepRecord<'_>) -> Result<()> {
        for callback in self.callbacks.iter_mut() {
            callback.on_step(step)?;
        }
        Ok(())
    }

    fn on_episode_end(&mut self, episode: &EpisodeSummary) -> Result<()> {
        for callback in self.callbacks.iter_mut() {
            callback.on_episode_end(episode)?;
        }
        Ok(())
    }

    fn on_training_end(&mut self) -> Result<()> {
        for callback in self.callbacks.iter_mut() {
            callback.on_training_end()?;
        }
        Ok(())
    }
}

/// A named set of scalars and histograms logged at one point of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsRecord {
    pub name: String,
    pub timestep: usize,
    pub scalars: Vec<(String, f64)>,
    pub histograms: Vec<(String, Vec<usize>)>,
}

impl MetricsRecord {
    pub fn new(name: impl Into<String>, timestep: usize) -> Self {
        Self {
            name: name.into(),
            timestep,
            ..Default::default()
        }
    }

    pub fn scalar(mut self, key: impl Into<String>, value: f64) -> Self {
        self.scalars.push((key.into(), value));
        self
    }

    pub fn histogram(mut self, key: impl Into<String>, counts: Vec<usize>) -> Self {
        self.histograms.push((key.into(), counts));
        self
    }

    pub fn get_scalar(&self, key: &str) -> Option<f64> {
        self.scalars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| *value)
    }
}

/// Destination of experiment metrics. Passed explicitly to whoever reports, there is no global
/// logging handle.
pub trait MetricsSink {
    fn log(&mut self, record: &MetricsRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: MetricsSink + ?Sized> MetricsSink for Box<S> {
    fn log(&mut self, record: &MetricsRecord) -> Result<()> {
        (**self).log(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
