use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::classifier_trait::ArtifactFormat;
use crate::models::factory::default_formats;

/// How the ensemble reacts to a model failing at inference time.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleMode {
    /// One failing model fails the whole request.
    #[default]
    AllOrNothing,
    /// Failing models are reported next to the successful predictions.
    Partial,
}

impl FromStr for EnsembleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "all_or_nothing" | "strict" => Ok(EnsembleMode::AllOrNothing),
            "partial" => Ok(EnsembleMode::Partial),
            _ => Err(format!(
                "Unknown ensemble mode: {}. Expected 'all_or_nothing' or 'partial'",
                s
            )),
        }
    }
}

/// Central configuration for the prediction service.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    /// Root directory holding one sub-directory of artifacts per organism.
    pub models_dir: PathBuf,
    /// Keep loaded models per organism instead of reloading on every request.
    pub cache_models: bool,
    pub ensemble_mode: EnsembleMode,
    /// Evaluate the models of an ensemble on the rayon thread pool.
    pub parallel_inference: bool,
    /// File extension -> artifact format.
    pub formats: BTreeMap<String, ArtifactFormat>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            cache_models: false,
            ensemble_mode: EnsembleMode::AllOrNothing,
            parallel_inference: true,
            formats: default_formats(),
        }
    }
}

impl ServiceConfig {
    pub fn new<P: Into<PathBuf>>(models_dir: P) -> Self {
        Self {
            models_dir: models_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_cache(mut self, cache_models: bool) -> Self {
        self.cache_models = cache_models;
        self
    }

    pub fn with_ensemble_mode(mut self, mode: EnsembleMode) -> Self {
        self.ensemble_mode = mode;
        self
    }
}
