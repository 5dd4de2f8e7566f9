use protrl_core::{
    Result,
    callbacks::{EpisodeSummary, MetricsRecord, MetricsSink, StepRecord, TrainingCallback},
};
use tracing::info;

/// Reports the mean reward of every finished episode together with cumulative histograms of the
/// edited positions and of the written residues.
pub struct EpisodeMetricsCallback<S> {
    sink: S,
    position_counts: Vec<usize>,
    residue_counts: Vec<usize>,
}

impl<S: MetricsSink> EpisodeMetricsCallback<S> {
    pub fn new(sink: S, length: usize, alphabet_size: usize) -> Self {
        Self {
            sink,
            position_counts: vec![0; length],
            residue_counts: vec![0; alphabet_size],
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn position_counts(&self) -> &[usize] {
        &self.position_counts
    }

    pub fn residue_counts(&self) -> &[usize] {
        &self.residue_counts
    }
}

fn bump(counts: &mut [usize], index: usize) {
    if let Some(count) = counts.get_mut(index) {
        *count += 1;
    }
}

impl<S: MetricsSink> TrainingCallback for EpisodeMetricsCallback<S> {
    fn on_step(&mut self, step: &StepRecord<'_>) -> Result<()> {
        bump(&mut self.position_counts, step.info.position);
        bump(&mut self.residue_counts, step.info.replacement);
        Ok(())
    }

    fn on_episode_end(&mut self, episode: &EpisodeSummary) -> Result<()> {
        let mut record = MetricsRecord::new("episode", episode.timestep)
            .scalar("episode", episode.episode as f64)
            .scalar("mean_reward", episode.mean_reward() as f64)
            .scalar("total_reward", episode.total_reward() as f64);
        if let Some(reward) = episode.final_reward() {
            record = record.scalar("final_reward", reward as f64);
        }
        let record = record
            .histogram("positions", self.position_counts.clone())
            .histogram("residues", self.residue_counts.clone());
        self.sink.log(&record)
    }

    fn on_training_end(&mut self) -> Result<()> {
        self.sink.flush()
    }
}

/// Logs a running summary every `log_every` episodes.
#[derive(Debug, Clone)]
pub struct ProgressCallback {
    log_every: usize,
    total_steps: usize,
    episodes: usize,
    reward_sum: f32,
    best_reward: f32,
}

impl ProgressCallback {
    pub fn new(log_every: usize) -> Self {
        Self {
            log_every: log_every.max(1),
            total_steps: 0,
            episodes: 0,
            reward_sum: 0.,
            best_reward: f32::NEG_INFINITY,
        }
    }

    pub fn episodes(&self) -> usize {
        self.episodes
    }

    pub fn best_reward(&self) -> Option<f32> {
        (self.episodes > 0).then_some(self.best_reward)
    }
}

impl TrainingCallback for ProgressCallback {
    fn on_training_start(&mut self, total_steps: usize) -> Result<()> {
        self.total_steps = total_steps;
        Ok(())
    }

    fn on_episode_end(&mut self, episode: &EpisodeSummary) -> Result<()> {
        let mean = episode.mean_reward();
        self.episodes += 1;
        self.reward_sum += mean;
        self.best_reward = self.best_reward.max(mean);
        if self.episodes % self.log_every == 0 {
            info!(
                timestep = episode.timestep,
                total_steps = self.total_steps,
                episodes = self.episodes,
                avg_reward = self.reward_sum / self.log_every as f32,
                best_reward = self.best_reward,
                "training progress"
            );
            self.reward_sum = 0.;
        }
        Ok(())
    }

    fn on_training_end(&mut self) -> Result<()> {
        info!(episodes = self.episodes, "training done");
        Ok(())
    }
}
