use crate::{
    codec::Alphabet,
    error::{Error, Result},
};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::index};
use std::cell::RefCell;

/// Replaces `mutations` distinct positions of `sequence`. Every replacement is drawn uniformly
/// from the alphabet minus the residue it replaces, so each chosen position really changes. A
/// single symbol alphabet leaves the sequence untouched.
pub fn random_mutation<R: Rng + ?Sized>(
    sequence: &[usize],
    mutations: usize,
    alphabet_size: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut mutated = sequence.to_vec();
    if alphabet_size < 2 {
        return mutated;
    }
    let amount = mutations.min(sequence.len());
    for position in index::sample(rng, sequence.len(), amount) {
        let original = mutated[position];
        let drawn = rng.random_range(0..alphabet_size - 1);
        mutated[position] = if drawn >= original { drawn + 1 } else { drawn };
    }
    mutated
}

impl Alphabet {
    pub fn random_mutation<R: Rng + ?Sized>(
        &self,
        sequence: &str,
        mutations: usize,
        rng: &mut R,
    ) -> Result<String> {
        let codes = self.encode(sequence)?;
        self.decode(&random_mutation(&codes, mutations, self.len(), rng))
    }
}

/// Something that proposes the replacement residue for a position of a sequence. The trained
/// mutation policy and the language model suggester both implement it.
pub trait MutationSource {
    fn suggest(&self, sequence: &str, position: usize) -> Result<char>;
}

impl<M: MutationSource + ?Sized> MutationSource for Box<M> {
    fn suggest(&self, sequence: &str, position: usize) -> Result<char> {
        (**self).suggest(sequence, position)
    }
}

/// Suggests a uniformly random residue, ignoring the sequence.
pub struct RandomMutationSource {
    alphabet: Alphabet,
    rng: RefCell<StdRng>,
}

impl RandomMutationSource {
    pub fn new(alphabet: Alphabet, seed: u64) -> Self {
        Self {
            alphabet,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl MutationSource for RandomMutationSource {
    fn suggest(&self, sequence: &str, position: usize) -> Result<char> {
        let length = sequence.chars().count();
        if position >= length {
            return Err(Error::ActionOutOfRange {
                action: position,
                size: length,
            });
        }
        let code = self
            .rng
            .borrow_mut()
            .random_range(0..self.alphabet.len());
        self.alphabet.symbol(code).ok_or(Error::UnknownCode {
            code,
            size: self.alphabet.len(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mutates_exactly_k_positions() {
        let mut rng = StdRng::seed_from_u64(7);
        let wild_type: Vec<usize> = (0..50).map(|i| i % 20).collect();
        for k in [0, 1, 5, 14, 50] {
            let mutated = random_mutation(&wild_type, k, 20, &mut rng);
            assert_eq!(mutated.len(), wild_type.len());
            let diff = mutated
                .iter()
                .zip(wild_type.iter())
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(diff, k);
            assert!(mutated.iter().all(|c| *c < 20));
        }
    }

    #[test]
    fn mutation_count_is_clamped_to_length() {
        let mut rng = StdRng::seed_from_u64(1);
        let mutated = random_mutation(&[0, 1, 2], 10, 3, &mut rng);
        assert!(mutated.iter().zip([0, 1, 2]).all(|(a, b)| *a != b));
    }

    #[test]
    fn string_variant_stays_in_alphabet() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(3);
        let alphabet = Alphabet::new("ABC")?;
        let mutated = alphabet.random_mutation("AAAAAA", 2, &mut rng)?;
        assert_eq!(mutated.len(), 6);
        assert_eq!(mutated.chars().filter(|c| *c != 'A').count(), 2);
        Ok(())
    }

    #[test]
    fn random_source_rejects_positions_past_the_end() -> Result<()> {
        let source = RandomMutationSource::new(Alphabet::new("ABC")?, 0);
        assert!(Alphabet::new("ABC")?.contains(source.suggest("ABC", 2)?));
        assert!(matches!(
            source.suggest("ABC", 3),
            Err(Error::ActionOutOfRange { action: 3, size: 3 })
        ));
        Ok(())
    }
}
