//! Reporting ensemble: every model answers separately, nothing is aggregated.
use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::EnsembleMode;
use crate::error::PromoterError;
use crate::models::classifier_trait::{Label, PromoterClassifier};
use crate::registry::OrganismModels;
use crate::sequence::FeatureVector;

/// Reported for a failed model in partial mode; the cause is only logged.
pub const MODEL_FAILED: &str = "prediction failed";

/// Per-model labels for one sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub organism: String,
    pub predictions: BTreeMap<String, Label>,
    /// Models that failed, only populated in partial mode.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl PredictionResult {
    /// Labels as plain integers, the shape consumed by result tables.
    pub fn as_integers(&self) -> BTreeMap<String, u8> {
        self.predictions
            .iter()
            .map(|(name, label)| (name.clone(), label.as_u8()))
            .collect()
    }

    pub fn positive_count(&self) -> usize {
        self.predictions
            .values()
            .filter(|&&label| label == Label::Promoter)
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct EnsemblePredictor {
    mode: EnsembleMode,
    parallel: bool,
}

impl Default for EnsemblePredictor {
    fn default() -> Self {
        Self {
            mode: EnsembleMode::AllOrNothing,
            parallel: true,
        }
    }
}

impl EnsemblePredictor {
    pub fn new(mode: EnsembleMode, parallel: bool) -> Self {
        Self { mode, parallel }
    }

    pub fn mode(&self) -> EnsembleMode {
        self.mode
    }

    pub fn run(
        &self,
        features: &FeatureVector,
        models: &OrganismModels,
    ) -> Result<PredictionResult, PromoterError> {
        let outcomes = self.evaluate(features, &models.models);

        let mut predictions = BTreeMap::new();
        let mut errors = BTreeMap::new();
        let mut first_failure = None;

        // outcomes are in model-name order, so the reported failure is deterministic
        for (name, outcome) in outcomes {
            match outcome {
                Ok(label) => {
                    debug!("{} -> {}", name, label);
                    predictions.insert(name, label);
                }
                Err(cause) => match self.mode {
                    EnsembleMode::AllOrNothing => {
                        if first_failure.is_none() {
                            first_failure = Some(PromoterError::Prediction { model: name, cause });
                        }
                    }
                    EnsembleMode::Partial => {
                        warn!("Model '{}' failed for {}: {:#}", name, models.organism, cause);
                        errors.insert(name.clone(), MODEL_FAILED.to_string());
                        if first_failure.is_none() {
                            first_failure = Some(PromoterError::Prediction { model: name, cause });
                        }
                    }
                },
            }
        }

        match (self.mode, first_failure) {
            (EnsembleMode::AllOrNothing, Some(err)) => return Err(err),
            (EnsembleMode::Partial, Some(err)) if predictions.is_empty() => return Err(err),
            _ => {}
        }

        Ok(PredictionResult {
            organism: models.organism.clone(),
            predictions,
            errors,
        })
    }

    fn evaluate(
        &self,
        features: &FeatureVector,
        models: &BTreeMap<String, Arc<dyn PromoterClassifier>>,
    ) -> Vec<(String, anyhow::Result<Label>)> {
        if self.parallel && models.len() > 1 {
            models
                .par_iter()
                .map(|(name, model)| (name.clone(), model.predict(features)))
                .collect()
        } else {
            models
                .iter()
                .map(|(name, model)| (name.clone(), model.predict(features)))
                .collect()
        }
    }
}
