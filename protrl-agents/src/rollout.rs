use candle_core::{Device, Result, Tensor};
use protrl_core::{
    rng::RNG,
    utils::rollout_buffer::{Advantages, Logps, Returns, RolloutBuffer},
};
use rand::seq::SliceRandom;

pub struct RolloutBatch {
    pub features: Tensor,
    pub actions: Tensor,
    pub returns: Tensor,
    pub advantages: Tensor,
    pub logp_old: Tensor,
}

/// Shuffled mini batches over every step of a set of rollouts. The last batch holds whatever is
/// left when the step count is not a multiple of the sample size.
pub struct RolloutBatchIterator<'a> {
    rollouts: &'a [RolloutBuffer<Vec<f32>>],
    advantages: &'a Advantages,
    returns: &'a Returns,
    logps: &'a Logps,
    indices: Vec<(usize, usize)>,
    current: usize,
    sample_size: usize,
    device: Device,
}

impl<'a> RolloutBatchIterator<'a> {
    pub fn new(
        rollouts: &'a [RolloutBuffer<Vec<f32>>],
        advantages: &'a Advantages,
        returns: &'a Returns,
        logps: &'a Logps,
        sample_size: usize,
        device: Device,
    ) -> Self {
        let mut indices: Vec<(usize, usize)> = rollouts
            .iter()
            .enumerate()
            .flat_map(|(i, rollout)| (0..rollout.len()).map(move |j| (i, j)))
            .collect();
        RNG.with_borrow_mut(|rng| indices.shuffle(rng));
        Self {
            rollouts,
            advantages,
            returns,
            logps,
            indices,
            current: 0,
            sample_size: sample_size.max(1),
            device,
        }
    }

    fn batch(&self, batch_indices: &[(usize, usize)]) -> Result<RolloutBatch> {
        let mut features = vec![];
        let mut actions = vec![];
        let mut width = 0;
        for (rollout_idx, idx) in batch_indices {
            let (state, action, _) = self.rollouts[*rollout_idx].sample_point(*idx);
            width = state.len();
            features.extend_from_slice(state);
            actions.push(action as u32);
        }
        let size = batch_indices.len();
        Ok(RolloutBatch {
            features: Tensor::from_vec(features, (size, width), &self.device)?,
            actions: Tensor::from_vec(actions, size, &self.device)?,
            returns: Tensor::from_vec(self.returns.sample(batch_indices), size, &self.device)?,
            advantages: Tensor::from_vec(
                self.advantages.sample(batch_indices),
                size,
                &self.device,
            )?,
            logp_old: Tensor::from_vec(self.logps.sample(batch_indices), size, &self.device)?,
        })
    }
}

impl Iterator for RolloutBatchIterator<'_> {
    type Item = Result<RolloutBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.indices.len() {
            return None;
        }
        let end = (self.current + self.sample_size).min(self.indices.len());
        let batch = self.batch(&self.indices[self.current..end]);
        self.current = end;
        Some(batch)
    }
}
