use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage at which a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Encoding,
    Loading,
    Inference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Stage::Validation => "validation",
            Stage::Encoding => "encoding",
            Stage::Loading => "loading",
            Stage::Inference => "inference",
        };
        write!(f, "{}", s)
    }
}

/// Why a raw sequence was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    Length { expected: usize, actual: usize },
    Alphabet { base: char, position: usize },
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvalidReason::Length { expected, actual } => write!(
                f,
                "Sequence must be exactly {} bases long, got {}.",
                expected, actual
            ),
            InvalidReason::Alphabet { base, position } => write!(
                f,
                "Invalid base '{}' at position {}. Only A, T, G, C allowed.",
                base, position
            ),
        }
    }
}

/// A single artifact that could not be loaded. Recorded and skipped, never fatal
/// on its own.
#[derive(Debug)]
pub struct ModelLoadError {
    pub file: PathBuf,
    pub cause: anyhow::Error,
}

impl fmt::Display for ModelLoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {:#}", self.file.display(), self.cause)
    }
}

/// Failures surfaced by the prediction pipeline.
#[derive(Debug, Error)]
pub enum PromoterError {
    #[error("{0}")]
    InvalidSequence(InvalidReason),

    #[error("Cannot encode a sequence of length {actual}; expected {expected}.")]
    Encoding { expected: usize, actual: usize },

    #[error("No models found for {organism}")]
    ResourceNotFound { organism: String, path: PathBuf },

    #[error("All models failed to load for {organism} ({} skipped)", .failures.len())]
    NoModelsAvailable {
        organism: String,
        failures: Vec<ModelLoadError>,
    },

    #[error("Model '{model}' failed during prediction: {cause:#}")]
    Prediction { model: String, cause: anyhow::Error },

    #[error("I/O error while reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PromoterError {
    pub fn stage(&self) -> Stage {
        match self {
            PromoterError::InvalidSequence(_) => Stage::Validation,
            PromoterError::Encoding { .. } => Stage::Encoding,
            PromoterError::ResourceNotFound { .. }
            | PromoterError::NoModelsAvailable { .. }
            | PromoterError::Io { .. } => Stage::Loading,
            PromoterError::Prediction { .. } => Stage::Inference,
        }
    }

    /// HTTP-style status code for the error.
    pub fn status(&self) -> u16 {
        match self {
            PromoterError::InvalidSequence(_) | PromoterError::Encoding { .. } => 400,
            PromoterError::ResourceNotFound { .. } => 404,
            _ => 500,
        }
    }

    /// Message that may be shown to a caller. Internal failures stay opaque.
    pub fn public_message(&self) -> String {
        match self.status() {
            400 | 404 => self.to_string(),
            _ => "Internal Server Error".to_string(),
        }
    }
}
