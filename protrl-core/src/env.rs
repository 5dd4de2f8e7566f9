use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Space {
    /// A single choice out of `n`
    Discrete(usize),
    /// `len` independent choices, each out of `n`
    MultiDiscrete { n: usize, len: usize },
    /// Concatenation of sub spaces
    Composite(Vec<Space>),
}

impl Space {
    /// Size of the flattened one-hot encoding of a sample.
    pub fn one_hot_size(&self) -> usize {
        match &self {
            Self::Discrete(n) => *n,
            Self::MultiDiscrete { n, len } => n * len,
            Self::Composite(spaces) => spaces.iter().map(|s| s.one_hot_size()).sum(),
        }
    }

    /// Whether `value` is a valid single choice. Composite spaces have no single choices.
    pub fn contains(&self, value: usize) -> bool {
        match &self {
            Self::Discrete(n) => value < *n,
            Self::MultiDiscrete { n, .. } => value < *n,
            Self::Composite(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    pub action_space: Space,
}

impl EnvironmentDescription {
    pub fn new(observation_space: Space, action_space: Space) -> Self {
        Self {
            observation_space,
            action_space,
        }
    }

    /// Number of discrete actions.
    pub fn action_size(&self) -> usize {
        self.action_space.one_hot_size()
    }

    pub fn observation_size(&self) -> usize {
        self.observation_space.one_hot_size()
    }
}

/// Which residue a step touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepInfo {
    pub step: usize,
    pub position: usize,
    pub previous: usize,
    pub replacement: usize,
}

impl StepInfo {
    /// False for no-op edits, where the replacement equals the residue already in place.
    pub fn changed(&self) -> bool {
        self.previous != self.replacement
    }
}

#[derive(Debug, Clone)]
pub struct SnapShot<T> {
    pub state: T,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

impl<T> SnapShot<T> {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    Ready,
    Running,
    Done,
}

/// Observation of the mutation environment: the sequence and the position that is going to be
/// edited. The position is picked by the environment, not by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationObservation {
    pub sequence: Vec<usize>,
    pub position: usize,
}

pub trait Env {
    type Observation: Clone;

    fn reset(&mut self, seed: u64) -> Result<Self::Observation>;
    fn step(&mut self, action: usize) -> Result<SnapShot<Self::Observation>>;
    fn env_description(&self) -> EnvironmentDescription;
    fn state(&self) -> EnvState;
}

/// Both environments observe a sequence, this gives the samplers access to it.
pub trait SequenceView {
    fn sequence(&self) -> &[usize];
}

impl SequenceView for Vec<usize> {
    fn sequence(&self) -> &[usize] {
        self
    }
}

impl SequenceView for MutationObservation {
    fn sequence(&self) -> &[usize] {
        &self.sequence
    }
}
