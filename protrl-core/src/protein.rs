use crate::{
    codec::Alphabet,
    error::{Error, Result},
    fitness::FitnessBounds,
};

/// Static data of a protein family: the wild type and the bounds used to normalize the oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProteinTarget {
    pub name: &'static str,
    pub wild_type: &'static str,
    pub bounds: FitnessBounds,
}

const GFP_WILD_TYPE: &str = "SKGEELFTGVVPILVELDGDVNGHKFSVSGEGEGDATYGKLTLKFICTTGKLPVPWPTLVTTLSYGVQCFSRYPDHMKQHDFFKSAMPEGYVQERTIFFKDDGNYKTRAEVKFEGDTLVNRIELKGIDFKEDGNILGHKLEYNYNSHNVYIMADKQKNGIKVNFKIRHNIEDGSVQLADHYQQNTPIGDGPVLLPDNHYLSTQSALSKDPNEKRDHMVLLEFVTAAGITHGMDELYK";

const AAV_WILD_TYPE: &str = "DEEEIRTTNPVATEQYGSVSTNLQRGNR";

pub const PROTEIN_TARGETS: [ProteinTarget; 2] = [
    ProteinTarget {
        name: "GFP",
        wild_type: GFP_WILD_TYPE,
        bounds: FitnessBounds {
            length: 237,
            min_fitness: 1.283_419_3,
            max_fitness: 4.123_108_4,
        },
    },
    ProteinTarget {
        name: "AAV",
        wild_type: AAV_WILD_TYPE,
        bounds: FitnessBounds {
            length: 28,
            min_fitness: 0.0,
            max_fitness: 19.5365,
        },
    },
];

pub fn protein_target(name: &str) -> Result<&'static ProteinTarget> {
    PROTEIN_TARGETS
        .iter()
        .find(|target| target.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::UnknownProtein(name.to_owned()))
}

/// `(length, min_fitness, max_fitness)` of a protein target.
pub fn fitness_info(name: &str) -> Result<FitnessBounds> {
    protein_target(name).map(|target| target.bounds)
}

impl ProteinTarget {
    pub fn encoded_wild_type(&self, alphabet: &Alphabet) -> Result<Vec<usize>> {
        alphabet.encode(self.wild_type)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wild_types_match_their_lengths() -> Result<()> {
        for target in PROTEIN_TARGETS.iter() {
            assert_eq!(target.wild_type.len(), target.bounds.length);
            target.encoded_wild_type(Alphabet::amino_acids())?;
        }
        Ok(())
    }

    #[test]
    fn lookup_is_case_insensitive() -> Result<()> {
        assert_eq!(fitness_info("gfp")?.length, 237);
        assert!(matches!(
            protein_target("LACTAMASE"),
            Err(Error::UnknownProtein(_))
        ));
        Ok(())
    }
}
