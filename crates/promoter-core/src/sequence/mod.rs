//! Sequence normalization and the kappa feature encoding.
//!
//! A promoter candidate is a 150 nt window over {A,T,G,C}. The encoder slides a
//! 6-mer window over it and scores each window's self-similarity, producing the
//! 145-value feature vector every stored classifier was trained on.
pub mod encode;
pub mod validate;

pub use encode::{window_score, FeatureVector, KappaEncoder};
pub use validate::{Sequence, SequenceValidator};

/// Length every submitted sequence must have.
pub const SEQUENCE_LENGTH: usize = 150;

/// Width of the sliding window used by the encoder.
pub const KMER_SIZE: usize = 6;

/// Number of features produced for one sequence.
pub const FEATURE_COUNT: usize = SEQUENCE_LENGTH - KMER_SIZE + 1;

pub(crate) const ALPHABET: &[u8] = b"ATGC";
