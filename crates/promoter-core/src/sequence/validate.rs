use std::fmt;

use crate::error::{InvalidReason, PromoterError};
use crate::sequence::{ALPHABET, SEQUENCE_LENGTH};

/// A validated, uppercase nucleotide sequence of the expected length.
///
/// Only [`SequenceValidator::validate`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sequence(String);

impl Sequence {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sequence {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes raw input and checks it against the length and alphabet rules.
#[derive(Debug, Clone)]
pub struct SequenceValidator {
    length: usize,
}

impl Default for SequenceValidator {
    fn default() -> Self {
        Self {
            length: SEQUENCE_LENGTH,
        }
    }
}

impl SequenceValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected_length(&self) -> usize {
        self.length
    }

    /// Trim, uppercase, then reject on length before alphabet.
    pub fn validate(&self, raw: &str) -> Result<Sequence, PromoterError> {
        let normalized = raw.trim().to_uppercase();

        let actual = normalized.chars().count();
        if actual != self.length {
            return Err(PromoterError::InvalidSequence(InvalidReason::Length {
                expected: self.length,
                actual,
            }));
        }

        if let Some((idx, base)) = normalized
            .chars()
            .enumerate()
            .find(|(_, c)| !c.is_ascii() || !ALPHABET.contains(&(*c as u8)))
        {
            return Err(PromoterError::InvalidSequence(InvalidReason::Alphabet {
                base,
                position: idx + 1,
            }));
        }

        Ok(Sequence(normalized))
    }
}
