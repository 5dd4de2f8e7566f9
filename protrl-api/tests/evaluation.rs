use protrl_api::{ComparisonConfig, compare_sources};
use protrl_core::{
    Error, Result,
    codec::Alphabet,
    mutation::{MutationSource, RandomMutationSource},
};

fn count_c(sequences: &[String]) -> Result<Vec<f32>> {
    Ok(sequences
        .iter()
        .map(|s| s.chars().filter(|c| *c == 'C').count() as f32 / s.len() as f32)
        .collect())
}

struct Always(char);

impl MutationSource for Always {
    fn suggest(&self, _sequence: &str, _position: usize) -> Result<char> {
        Ok(self.0)
    }
}

#[test]
fn sources_are_compared_on_the_same_trials() -> Result<()> {
    let alphabet = Alphabet::new("ABC")?;
    let always_c = Always('C');
    let always_a = Always('A');
    let random = RandomMutationSource::new(alphabet.clone(), 1);
    let sources: [(&str, &dyn MutationSource); 3] =
        [("c", &always_c), ("a", &always_a), ("random", &random)];
    let config = ComparisonConfig {
        samples: 25,
        mutations: 2,
        seed: 7,
    };
    let report = compare_sources("AAAAAAAA", &alphabet, &count_c, &sources, config)?;
    assert_eq!(report.positions.len(), 25);
    assert_eq!(report.baseline.len(), 25);
    assert_eq!(report.sources.len(), 3);

    let c = report.source("c").ok_or(Error::config("missing report"))?;
    let a = report.source("a").ok_or(Error::config("missing report"))?;
    assert_eq!(c.suggestions, vec!['C'; 25]);
    // writing a C never lowers the count of Cs, writing an A never raises it
    for ((baseline, c_fitness), a_fitness) in report.baseline.iter().zip(&c.fitness).zip(&a.fitness)
    {
        assert!(c_fitness >= baseline);
        assert!(a_fitness <= baseline);
    }
    assert_eq!(a.improvements, 0);
    assert!(c.improvements > 0);
    assert!(c.improvement_rate() > 0.);
    assert!(c.mean_fitness() >= a.mean_fitness());

    let random = report.source("random").ok_or(Error::config("missing report"))?;
    assert!(random.suggestions.iter().all(|s| alphabet.contains(*s)));
    Ok(())
}

#[test]
fn comparisons_are_reproducible_for_a_seed() -> Result<()> {
    let alphabet = Alphabet::new("ABC")?;
    let always_c = Always('C');
    let sources: [(&str, &dyn MutationSource); 1] = [("c", &always_c)];
    let config = ComparisonConfig {
        samples: 10,
        mutations: 3,
        seed: 11,
    };
    let first = compare_sources("ABCABCAB", &alphabet, &count_c, &sources, config)?;
    let second = compare_sources("ABCABCAB", &alphabet, &count_c, &sources, config)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn suggestions_outside_the_alphabet_fail() -> Result<()> {
    let alphabet = Alphabet::new("ABC")?;
    let unknown = Always('X');
    let sources: [(&str, &dyn MutationSource); 1] = [("x", &unknown)];
    assert!(matches!(
        compare_sources(
            "ABCABC",
            &alphabet,
            &count_c,
            &sources,
            ComparisonConfig::default()
        ),
        Err(Error::UnknownSymbol { symbol: 'X', .. })
    ));
    Ok(())
}
