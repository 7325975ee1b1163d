use std::ops::Deref;

use serde::Serialize;

use crate::error::PromoterError;
use crate::sequence::{Sequence, KMER_SIZE, SEQUENCE_LENGTH};

/// Ordered kappa scores, one per sliding window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for FeatureVector {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        FeatureVector(values)
    }
}

/// Kappa self-similarity score of one window.
///
/// Every suffix `w[i+1..]` is compared position-wise with the prefix of the same
/// length. The match count of each comparison is reduced modulo the compared
/// length and scaled by 100; the integer sum is divided by `L - 1` and scaled by
/// 100 again. Stored classifiers were trained on these exact values, so the
/// order of operations must not change.
pub fn window_score(window: &[u8]) -> f64 {
    let len = window.len();
    if len <= 1 {
        return 0.0;
    }

    let mut total: u64 = 0;
    for i in 0..len - 1 {
        let suffix = &window[i + 1..];
        let len2 = suffix.len();
        let prefix = &window[..len2];
        let matches = prefix
            .iter()
            .zip(suffix.iter())
            .filter(|(a, b)| a == b)
            .count();
        total += ((matches % len2) * 100) as u64;
    }

    (total as f64 / (len - 1) as f64) * 100.0
}

/// Slides a fixed-width window over a sequence and scores each window.
#[derive(Debug, Clone)]
pub struct KappaEncoder {
    kmer_size: usize,
    sequence_length: usize,
}

impl Default for KappaEncoder {
    fn default() -> Self {
        Self {
            kmer_size: KMER_SIZE,
            sequence_length: SEQUENCE_LENGTH,
        }
    }
}

impl KappaEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feature_count(&self) -> usize {
        self.sequence_length - self.kmer_size + 1
    }

    pub fn encode(&self, seq: &Sequence) -> Result<FeatureVector, PromoterError> {
        self.encode_bytes(seq.as_bytes())
    }

    /// Encode raw bytes. Only the length is checked here; alphabet checks belong
    /// to the validator.
    pub fn encode_bytes(&self, seq: &[u8]) -> Result<FeatureVector, PromoterError> {
        if seq.len() != self.sequence_length {
            return Err(PromoterError::Encoding {
                expected: self.sequence_length,
                actual: seq.len(),
            });
        }

        let features: Vec<f64> = seq.windows(self.kmer_size).map(window_score).collect();
        debug_assert_eq!(features.len(), self.feature_count());
        Ok(FeatureVector(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{SequenceValidator, FEATURE_COUNT};

    #[test]
    fn test_window_score_short_windows() {
        assert_eq!(window_score(b""), 0.0);
        assert_eq!(window_score(b"A"), 0.0);
        assert_eq!(window_score(b"AT"), 0.0);
    }

    #[test]
    fn test_window_score_homopolymer_is_zero() {
        // Full agreement at every offset reduces to zero under the modulo.
        assert_eq!(window_score(b"AAAAAA"), 0.0);
        assert_eq!(window_score(b"GGGGGG"), 0.0);
    }

    #[test]
    fn test_window_score_known_values() {
        // offsets contribute 400 + 300 + 200 + 100 + 0 = 1000 -> 1000 / 5 * 100
        assert_eq!(window_score(b"AAAAAT"), 20000.0);
        // 200 + 100 + 0 + 100 + 0 = 400 -> 400 / 5 * 100
        assert_eq!(window_score(b"AATAAT"), 8000.0);
        assert_eq!(window_score(b"ATGCAT"), 0.0);
        // three characters: "AA" vs "AA" is 2 % 2 = 0, "A" vs "A" is 1 % 1 = 0
        assert_eq!(window_score(b"AAA"), 0.0);
        // "AT" vs "AA": 1 match -> 100; "T" vs "A": 0 -> 100 / 2 * 100
        assert_eq!(window_score(b"AAT"), 5000.0);
    }

    #[test]
    fn test_encode_homopolymer() {
        let seq = SequenceValidator::new().validate(&"A".repeat(150)).unwrap();
        let features = KappaEncoder::new().encode(&seq).unwrap();
        assert_eq!(features.len(), FEATURE_COUNT);
        assert!(features.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_encode_windows_line_up() {
        let mut raw = "A".repeat(150);
        raw.replace_range(5..6, "T");
        let features = KappaEncoder::new().encode_bytes(raw.as_bytes()).unwrap();
        // window 0 is "AAAAAT"
        assert_eq!(features[0], 20000.0);
        // windows past the T are homopolymers again
        assert_eq!(features[6], 0.0);
        assert_eq!(features[144], 0.0);
    }

    #[test]
    fn test_encode_bytes_rejects_wrong_length() {
        let err = KappaEncoder::new().encode_bytes(b"ACGT").unwrap_err();
        assert!(matches!(
            err,
            PromoterError::Encoding {
                expected: 150,
                actual: 4
            }
        ));
    }
}
