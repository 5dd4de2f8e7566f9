use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Maps sequences to normalized fitness, one value per sequence.
pub trait FitnessScorer {
    fn score(&self, sequences: &[String]) -> Result<Vec<f32>>;
}

impl<F> FitnessScorer for F
where
    F: Fn(&[String]) -> Result<Vec<f32>>,
{
    fn score(&self, sequences: &[String]) -> Result<Vec<f32>> {
        (self)(sequences)
    }
}

/// Sequence length and the historical fitness range of a protein target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessBounds {
    pub length: usize,
    pub min_fitness: f32,
    pub max_fitness: f32,
}

impl FitnessBounds {
    pub fn new(length: usize, min_fitness: f32, max_fitness: f32) -> Self {
        Self {
            length,
            min_fitness,
            max_fitness,
        }
    }

    /// `(raw - min) / (max - min)`. Not clipped, predictions outside of the historical range map
    /// outside of [0, 1].
    pub fn normalize(&self, raw: f32) -> f32 {
        (raw - self.min_fitness) / (self.max_fitness - self.min_fitness)
    }

    pub fn normalize_all(&self, raw: &[f32]) -> Vec<f32> {
        raw.iter().map(|r| self.normalize(*r)).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalization_is_monotonic() {
        let bounds = FitnessBounds::new(237, 1.283, 4.123);
        let raws = [-3.0f32, 0.0, 1.283, 2.5, 4.123, 9.0];
        for pair in raws.windows(2) {
            assert!(bounds.normalize(pair[1]) > bounds.normalize(pair[0]));
        }
    }

    #[test]
    fn bounds_map_to_unit_interval_edges() {
        let bounds = FitnessBounds::new(28, 0.0, 19.5365);
        assert_eq!(bounds.normalize(0.0), 0.0);
        assert!((bounds.normalize(19.5365) - 1.0).abs() < 1e-6);
        assert!(bounds.normalize(25.0) > 1.0);
    }

    #[test]
    fn closures_are_scorers() -> Result<()> {
        let scorer = |sequences: &[String]| -> Result<Vec<f32>> {
            Ok(sequences.iter().map(|s| s.len() as f32).collect())
        };
        assert_eq!(scorer.score(&["AAA".to_owned(), "A".to_owned()])?, vec![3., 1.]);
        Ok(())
    }
}
