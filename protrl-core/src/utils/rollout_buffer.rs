use derive_more::Deref;

/// Transitions collected by a sampler between two learning phases. `states` holds one more entry
/// than the other vectors: the state the environment was left in, used to bootstrap the value of
/// an unfinished episode.
#[derive(Debug, Clone)]
pub struct RolloutBuffer<T: Clone> {
    pub states: Vec<T>,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
    pub logps: Vec<f32>,
}

impl<T: Clone> Default for RolloutBuffer<T> {
    fn default() -> Self {
        Self {
            states: vec![],
            actions: vec![],
            rewards: vec![],
            dones: vec![],
            logps: vec![],
        }
    }
}

impl<T: Clone> RolloutBuffer<T> {
    pub fn push_step(&mut self, state: T, action: usize, reward: f32, done: bool, logp: f32) {
        self.states.push(state);
        self.actions.push(action);
        self.rewards.push(reward);
        self.dones.push(done);
        self.logps.push(logp);
    }

    pub fn set_last_state(&mut self, state: T) {
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn sample_point(&self, index: usize) -> (&T, usize, f32) {
        (&self.states[index], self.actions[index], self.logps[index])
    }

    pub fn completed_episodes(&self) -> usize {
        self.dones.iter().filter(|d| **d).count()
    }
}

/// Generalized advantage estimation over a set of rollouts. `values[i]` holds the value estimate
/// of every state of `rollouts[i]`, the bootstrap state included.
pub fn calculate_advantages_and_returns<T: Clone>(
    rollouts: &[RolloutBuffer<T>],
    values: &[Vec<f32>],
    gamma: f32,
    lambda: f32,
) -> (Advantages, Returns) {
    let mut advantages = Vec::with_capacity(rollouts.len());
    let mut returns = Vec::with_capacity(rollouts.len());
    for (rollout, values) in rollouts.iter().zip(values.iter()) {
        let total_steps = rollout.rewards.len();
        let mut rollout_advantages = vec![0f32; total_steps];
        let mut rollout_returns = vec![0f32; total_steps];
        let mut last_gae_lam = 0f32;
        for i in (0..total_steps).rev() {
            let next_non_terminal = if rollout.dones[i] {
                last_gae_lam = 0.;
                0f32
            } else {
                1.
            };
            let delta = rollout.rewards[i] + next_non_terminal * gamma * values[i + 1] - values[i];
            last_gae_lam = delta + next_non_terminal * gamma * lambda * last_gae_lam;
            rollout_advantages[i] = last_gae_lam;
            rollout_returns[i] = last_gae_lam + values[i];
        }
        advantages.push(rollout_advantages);
        returns.push(rollout_returns);
    }
    (Advantages(advantages), Returns(returns))
}

fn sample_from(values: &[Vec<f32>], indices: &[(usize, usize)]) -> Vec<f32> {
    indices
        .iter()
        .map(|(rollout, step)| values[*rollout][*step])
        .collect()
}

#[derive(Deref, Debug, Clone)]
pub struct Advantages(pub Vec<Vec<f32>>);

impl Advantages {
    pub fn sample(&self, indices: &[(usize, usize)]) -> Vec<f32> {
        sample_from(&self.0, indices)
    }

    pub fn normalize(&mut self) {
        for advantage in self.0.iter_mut() {
            if advantage.is_empty() {
                continue;
            }
            let mean = advantage.iter().sum::<f32>() / advantage.len() as f32;
            let variance =
                advantage.iter().map(|x| (*x - mean).powi(2)).sum::<f32>() / advantage.len() as f32;
            let std = variance.sqrt() + 1e-8;
            for x in advantage.iter_mut() {
                *x = (*x - mean) / std;
            }
        }
    }
}

#[derive(Deref, Debug, Clone)]
pub struct Returns(pub Vec<Vec<f32>>);

impl Returns {
    pub fn sample(&self, indices: &[(usize, usize)]) -> Vec<f32> {
        sample_from(&self.0, indices)
    }
}

#[derive(Deref, Debug, Clone)]
pub struct Logps(pub Vec<Vec<f32>>);

impl Logps {
    pub fn new<T: Clone>(rollouts: &[RolloutBuffer<T>]) -> Self {
        Self(rollouts.iter().map(|r| r.logps.clone()).collect())
    }

    pub fn sample(&self, indices: &[(usize, usize)]) -> Vec<f32> {
        sample_from(&self.0, indices)
    }
}
