//! Property checks of the kappa encoder over random sequences.

use promoter_core::sequence::{window_score, FEATURE_COUNT, KMER_SIZE, SEQUENCE_LENGTH};
use promoter_core::{KappaEncoder, SequenceValidator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_sequence(rng: &mut StdRng) -> String {
    (0..SEQUENCE_LENGTH)
        .map(|_| b"ATGC"[rng.gen_range(0..4)] as char)
        .collect()
}

#[test]
fn features_match_window_scores() {
    let mut rng = StdRng::seed_from_u64(42);
    let validator = SequenceValidator::new();
    let encoder = KappaEncoder::new();

    for _ in 0..50 {
        let raw = random_sequence(&mut rng);
        let seq = validator.validate(&raw).unwrap();
        let features = encoder.encode(&seq).unwrap();

        assert_eq!(features.len(), FEATURE_COUNT);
        for (i, value) in features.iter().enumerate() {
            let expected = window_score(&raw.as_bytes()[i..i + KMER_SIZE]);
            assert_eq!(*value, expected);
            assert!((0.0..=20000.0).contains(value), "out of range: {}", value);
        }
    }
}

#[test]
fn encoding_is_deterministic_and_case_insensitive() {
    let mut rng = StdRng::seed_from_u64(7);
    let raw = random_sequence(&mut rng);
    let validator = SequenceValidator::new();
    let encoder = KappaEncoder::new();

    let upper = encoder.encode(&validator.validate(&raw).unwrap()).unwrap();
    let lower = encoder
        .encode(&validator.validate(&raw.to_lowercase()).unwrap())
        .unwrap();
    let again = encoder.encode(&validator.validate(&raw).unwrap()).unwrap();

    assert_eq!(upper, lower);
    assert_eq!(upper, again);
}

#[test]
fn homopolymer_encodes_to_zeros() {
    let seq = SequenceValidator::new().validate(&"G".repeat(150)).unwrap();
    let features = KappaEncoder::new().encode(&seq).unwrap();
    assert!(features.iter().all(|&v| v == 0.0));
}
