use protrl_core::env::MutationObservation;

/// Turns an environment observation into the flat input of the networks.
pub trait Featurizer<O>: Clone {
    fn feature_size(&self) -> usize;
    fn featurize(&self, observation: &O) -> Vec<f32>;
}

fn one_hot_into(features: &mut [f32], codes: &[usize], alphabet_size: usize) {
    for (row, code) in codes.iter().enumerate() {
        if *code < alphabet_size {
            features[row * alphabet_size + code] = 1.;
        }
    }
}

/// One-hot sequence, the input of the position policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceFeaturizer {
    pub alphabet_size: usize,
    pub length: usize,
}

impl Featurizer<Vec<usize>> for SequenceFeaturizer {
    fn feature_size(&self) -> usize {
        self.alphabet_size * self.length
    }

    fn featurize(&self, observation: &Vec<usize>) -> Vec<f32> {
        let mut features = vec![0f32; self.feature_size()];
        let codes = &observation[..observation.len().min(self.length)];
        one_hot_into(&mut features, codes, self.alphabet_size);
        features
    }
}

/// One-hot sequence followed by the one-hot position, the input of the mutation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePositionFeaturizer {
    pub alphabet_size: usize,
    pub length: usize,
}

impl Featurizer<MutationObservation> for SequencePositionFeaturizer {
    fn feature_size(&self) -> usize {
        self.alphabet_size * self.length + self.length
    }

    fn featurize(&self, observation: &MutationObservation) -> Vec<f32> {
        let mut features = vec![0f32; self.feature_size()];
        let sequence_size = self.alphabet_size * self.length;
        let codes = &observation.sequence[..observation.sequence.len().min(self.length)];
        one_hot_into(&mut features[..sequence_size], codes, self.alphabet_size);
        if observation.position < self.length {
            features[sequence_size + observation.position] = 1.;
        }
        features
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn position_follows_the_sequence() {
        let featurizer = SequencePositionFeaturizer {
            alphabet_size: 3,
            length: 2,
        };
        let features = featurizer.featurize(&MutationObservation {
            sequence: vec![2, 0],
            position: 1,
        });
        assert_eq!(features, vec![0., 0., 1., 1., 0., 0., 0., 1.]);
    }

    #[test]
    fn sequence_features_are_one_hot() {
        let featurizer = SequenceFeaturizer {
            alphabet_size: 2,
            length: 3,
        };
        assert_eq!(featurizer.featurize(&vec![1, 1, 0]), vec![0., 1., 0., 1., 1., 0.]);
    }
}
