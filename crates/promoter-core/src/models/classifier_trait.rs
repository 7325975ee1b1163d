use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize, Serializer};

use crate::sequence::FeatureVector;

/// Binary class assigned by a single model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    NonPromoter,
    Promoter,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::NonPromoter => 0,
            Label::Promoter => 1,
        }
    }

    /// Label for a probability-like score, positive above 0.5.
    pub fn from_probability(p: f64) -> Self {
        if p > 0.5 {
            Label::Promoter
        } else {
            Label::NonPromoter
        }
    }

    /// Label for a raw margin, positive above zero.
    pub fn from_margin(margin: f64) -> Self {
        if margin > 0.0 {
            Label::Promoter
        } else {
            Label::NonPromoter
        }
    }
}

impl TryFrom<u8> for Label {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Label::NonPromoter),
            1 => Ok(Label::Promoter),
            other => Err(anyhow::anyhow!("label must be 0 or 1, got {}", other)),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Storage format a classifier was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactFormat {
    /// serde-tagged model envelope deserialized straight into a classifier
    GenericSerialized,
    /// XGBoost JSON model document
    GradientBoostedJson,
    /// CatBoost oblivious-tree model
    GradientBoostedCbm,
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArtifactFormat::GenericSerialized => "generic-serialized",
            ArtifactFormat::GradientBoostedJson => "gradient-boosted-json",
            ArtifactFormat::GradientBoostedCbm => "gradient-boosted-cbm",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generic-serialized" | "serialized" | "model" => Ok(ArtifactFormat::GenericSerialized),
            "gradient-boosted-json" | "xgboost" | "json" => Ok(ArtifactFormat::GradientBoostedJson),
            "gradient-boosted-cbm" | "catboost" | "cbm" => Ok(ArtifactFormat::GradientBoostedCbm),
            _ => Err(format!("Unknown artifact format: {}", s)),
        }
    }
}

/// A trained binary promoter classifier.
///
/// Implementations are immutable once loaded so a single instance can be shared
/// across requests and threads.
pub trait PromoterClassifier: Send + Sync {
    /// Classify one encoded sequence.
    fn predict(&self, features: &FeatureVector) -> Result<Label>;

    fn format(&self) -> ArtifactFormat;

    /// Optional human readable description of the model
    fn describe(&self) -> String {
        self.format().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_serializes_as_integer() {
        let json = serde_json::to_string(&vec![Label::Promoter, Label::NonPromoter]).unwrap();
        assert_eq!(json, "[1,0]");
        assert!(Label::try_from(2u8).is_err());
        assert_eq!(Label::try_from(1u8).unwrap(), Label::Promoter);
    }

    #[test]
    fn test_label_thresholds() {
        assert_eq!(Label::from_probability(0.5), Label::NonPromoter);
        assert_eq!(Label::from_probability(0.51), Label::Promoter);
        assert_eq!(Label::from_margin(0.0), Label::NonPromoter);
        assert_eq!(Label::from_margin(1e-6), Label::Promoter);
    }

    #[test]
    fn test_format_round_trips_through_names() {
        for format in [
            ArtifactFormat::GenericSerialized,
            ArtifactFormat::GradientBoostedJson,
            ArtifactFormat::GradientBoostedCbm,
        ] {
            assert_eq!(format.to_string().parse::<ArtifactFormat>().unwrap(), format);
        }
        assert!("onnx".parse::<ArtifactFormat>().is_err());
    }
}
