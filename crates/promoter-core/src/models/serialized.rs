//! Generic serialized artifacts.
//!
//! A `.model` file is a serde-tagged JSON envelope that deserializes directly
//! into one of the classifier kinds below:
//!
//! ```json
//! {"kind": "constant", "label": 1}
//! {"kind": "logistic", "weights": [0.1, ...], "intercept": -2.0}
//! {"kind": "gbdt", "model": { ...output of gbdt::gradient_boost::GBDT::save_model... }}
//! ```
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use gbdt::gradient_boost::GBDT;
use serde::Deserialize;

use crate::models::classifier_trait::{ArtifactFormat, Label, PromoterClassifier};
use crate::models::factory::ArtifactLoader;
use crate::models::gbdt::GBDTClassifier;
use crate::sequence::FeatureVector;

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedModel {
    Constant {
        label: u8,
    },
    Logistic {
        weights: Vec<f64>,
        intercept: f64,
    },
    Gbdt {
        model: GBDT,
        #[serde(default)]
        threshold: Option<f32>,
    },
}

impl SerializedModel {
    pub fn into_classifier(self) -> Result<Box<dyn PromoterClassifier>> {
        match self {
            SerializedModel::Constant { label } => {
                Ok(Box::new(ConstantClassifier::new(Label::try_from(label)?)))
            }
            SerializedModel::Logistic { weights, intercept } => {
                if weights.is_empty() {
                    return Err(anyhow!("logistic model has no weights"));
                }
                Ok(Box::new(LogisticClassifier { weights, intercept }))
            }
            SerializedModel::Gbdt { model, threshold } => {
                Ok(Box::new(GBDTClassifier::new(model, threshold)))
            }
        }
    }
}

/// Always answers with the same label. Used for baselines and fixtures.
pub struct ConstantClassifier {
    label: Label,
}

impl ConstantClassifier {
    pub fn new(label: Label) -> Self {
        Self { label }
    }
}

impl PromoterClassifier for ConstantClassifier {
    fn predict(&self, _features: &FeatureVector) -> Result<Label> {
        Ok(self.label)
    }

    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::GenericSerialized
    }

    fn describe(&self) -> String {
        format!("constant ({})", self.label)
    }
}

/// Logistic regression over the kappa features.
pub struct LogisticClassifier {
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticClassifier {
    pub fn probability(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() != self.weights.len() {
            return Err(anyhow!(
                "logistic model expects {} features, got {}",
                self.weights.len(),
                features.len()
            ));
        }
        let z: f64 = self
            .weights
            .iter()
            .zip(features.iter())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

impl PromoterClassifier for LogisticClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<Label> {
        Ok(Label::from_probability(self.probability(features)?))
    }

    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::GenericSerialized
    }

    fn describe(&self) -> String {
        format!("logistic ({} weights)", self.weights.len())
    }
}

/// Loader for generic serialized envelopes.
pub struct SerializedLoader;

impl ArtifactLoader for SerializedLoader {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::GenericSerialized
    }

    fn load(&self, path: &Path) -> Result<Box<dyn PromoterClassifier>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model: {}", path.display()))?;
        let model: SerializedModel = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse serialized model: {}", path.display()))?;
        model.into_classifier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gbdt::tests::train_toy_gbdt;

    fn features(value: f64) -> FeatureVector {
        FeatureVector::from(vec![value; 145])
    }

    #[test]
    fn test_constant_envelope() {
        let model: SerializedModel = serde_json::from_str(r#"{"kind": "constant", "label": 1}"#).unwrap();
        let classifier = model.into_classifier().unwrap();
        assert_eq!(classifier.predict(&features(0.0)).unwrap(), Label::Promoter);

        let model: SerializedModel = serde_json::from_str(r#"{"kind": "constant", "label": 7}"#).unwrap();
        assert!(model.into_classifier().is_err());
    }

    #[test]
    fn test_logistic_envelope() {
        let json = serde_json::json!({
            "kind": "logistic",
            "weights": vec![0.001; 145],
            "intercept": -10.0,
        });
        let model: SerializedModel = serde_json::from_value(json).unwrap();
        let classifier = model.into_classifier().unwrap();

        // z = 145 * 0.001 * 0 - 10
        assert_eq!(classifier.predict(&features(0.0)).unwrap(), Label::NonPromoter);
        // z = 145 * 0.001 * 1000 - 10 = 135
        assert_eq!(classifier.predict(&features(1000.0)).unwrap(), Label::Promoter);

        let short = FeatureVector::from(vec![1.0; 10]);
        assert!(classifier.predict(&short).is_err());
    }

    #[test]
    fn test_gbdt_envelope_from_saved_model() {
        let gbdt = train_toy_gbdt(145);
        let json = serde_json::json!({
            "kind": "gbdt",
            "model": serde_json::to_value(&gbdt).unwrap(),
            "threshold": 0.5,
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gbdt.model");
        std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        let classifier = SerializedLoader.load(&path).unwrap();
        assert_eq!(classifier.format(), ArtifactFormat::GenericSerialized);
        assert_eq!(classifier.predict(&features(0.0)).unwrap(), Label::NonPromoter);
        assert_eq!(classifier.predict(&features(20000.0)).unwrap(), Label::Promoter);
    }

    #[test]
    fn test_unknown_kind_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svm.model");
        std::fs::write(&path, r#"{"kind": "svm", "support_vectors": []}"#).unwrap();
        assert!(SerializedLoader.load(&path).is_err());
    }
}
