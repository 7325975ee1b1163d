use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::{anyhow, Result};
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;

use crate::models::classifier_trait::{ArtifactFormat, Label, PromoterClassifier};
use crate::sequence::FeatureVector;

fn default_threshold() -> f32 {
    0.5
}

/// Gradient Boosting Decision Tree (GBDT) classifier restored from a serialized
/// `gbdt` model.
pub struct GBDTClassifier {
    model: GBDT,
    threshold: f32,
}

impl GBDTClassifier {
    pub fn new(model: GBDT, threshold: Option<f32>) -> Self {
        GBDTClassifier {
            model,
            threshold: threshold.unwrap_or_else(default_threshold),
        }
    }

    /// Raw model output for one feature vector. With the log-likelihood loss this
    /// is the probability of the positive class.
    pub fn score(&self, features: &FeatureVector) -> Result<f32> {
        let mut test_x = DataVec::new();
        test_x.push(Data::new_training_data(features.to_f32(), 1.0, 0.0, None));

        // gbdt asserts on malformed or untrained models instead of returning errors
        let predictions = catch_unwind(AssertUnwindSafe(|| self.model.predict(&test_x)))
            .map_err(|_| anyhow!("gbdt model panicked during prediction"))?;

        predictions
            .first()
            .copied()
            .ok_or_else(|| anyhow!("gbdt model returned no prediction"))
    }
}

impl PromoterClassifier for GBDTClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<Label> {
        let score = self.score(features)?;
        if !score.is_finite() {
            return Err(anyhow!("gbdt model produced a non-finite score: {}", score));
        }
        Ok(if score > self.threshold {
            Label::Promoter
        } else {
            Label::NonPromoter
        })
    }

    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::GenericSerialized
    }

    fn describe(&self) -> String {
        format!("gbdt (threshold {})", self.threshold)
    }
}
