//! CatBoost oblivious-tree models.
//!
//! Artifacts with the `.cbm` extension are read in CatBoost's JSON export schema
//! (`save_model(path, format="json")`). The native flatbuffer form starts with the
//! `CBM1` magic and is rejected with an explicit error so the file gets skipped.
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::debug;
use serde::Deserialize;

use crate::models::classifier_trait::{ArtifactFormat, Label, PromoterClassifier};
use crate::models::factory::ArtifactLoader;
use crate::sequence::FeatureVector;

const CBM_MAGIC: &[u8] = b"CBM1";

#[derive(Deserialize)]
struct CatBoostDocument {
    #[serde(default)]
    features_info: Option<FeaturesInfo>,
    oblivious_trees: Vec<ObliviousTreeDoc>,
    #[serde(default)]
    scale_and_bias: Option<(f64, Bias)>,
}

#[derive(Deserialize)]
struct FeaturesInfo {
    #[serde(default)]
    float_features: Vec<FloatFeature>,
}

#[derive(Deserialize)]
struct FloatFeature {
    feature_index: usize,
    #[serde(default)]
    flat_feature_index: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Bias {
    Single(f64),
    PerDimension(Vec<f64>),
}

#[derive(Deserialize)]
struct ObliviousTreeDoc {
    leaf_values: Vec<f64>,
    splits: Vec<SplitDoc>,
}

#[derive(Deserialize)]
struct SplitDoc {
    #[serde(default)]
    float_feature_index: Option<usize>,
    #[serde(default)]
    border: Option<f32>,
    #[serde(default)]
    split_type: Option<String>,
}

#[derive(Debug, Clone)]
struct ObliviousTree {
    /// (flat feature index, border) per depth level
    splits: Vec<(usize, f32)>,
    leaf_values: Vec<f64>,
}

impl ObliviousTree {
    fn leaf_value(&self, features: &[f32]) -> f64 {
        let mut index = 0usize;
        for (depth, &(feature, border)) in self.splits.iter().enumerate() {
            if features[feature] > border {
                index |= 1 << depth;
            }
        }
        self.leaf_values[index]
    }
}

/// Binary CatBoost classifier (Logloss-style raw output).
pub struct CatBoostClassifier {
    trees: Vec<ObliviousTree>,
    scale: f64,
    bias: f64,
    required_features: usize,
}

impl CatBoostClassifier {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let doc: CatBoostDocument = serde_json::from_str(content)?;

        // split float_feature_index -> position in the full feature vector
        let flat_index = |float_index: usize| -> usize {
            doc.features_info
                .as_ref()
                .and_then(|info| {
                    info.float_features
                        .iter()
                        .find(|f| f.feature_index == float_index)
                        .and_then(|f| f.flat_feature_index)
                })
                .unwrap_or(float_index)
        };

        let mut trees = Vec::with_capacity(doc.oblivious_trees.len());
        for (tree_id, tree) in doc.oblivious_trees.iter().enumerate() {
            if tree.splits.len() >= usize::BITS as usize {
                bail!("tree {} is too deep ({} levels)", tree_id, tree.splits.len());
            }
            let expected_leaves = 1usize << tree.splits.len();
            if tree.leaf_values.len() != expected_leaves {
                bail!(
                    "tree {} has {} leaf values, expected {}; only single-dimension models are supported",
                    tree_id,
                    tree.leaf_values.len(),
                    expected_leaves
                );
            }

            let mut splits = Vec::with_capacity(tree.splits.len());
            for split in &tree.splits {
                match (split.split_type.as_deref(), split.float_feature_index, split.border) {
                    (None | Some("FloatFeature"), Some(index), Some(border)) => {
                        splits.push((flat_index(index), border))
                    }
                    (kind, _, _) => bail!(
                        "tree {} uses a {} split, only float feature splits are supported",
                        tree_id,
                        kind.unwrap_or("malformed")
                    ),
                }
            }
            trees.push(ObliviousTree {
                splits,
                leaf_values: tree.leaf_values.clone(),
            });
        }

        let (scale, bias) = match doc.scale_and_bias {
            None => (1.0, 0.0),
            Some((scale, Bias::Single(bias))) => (scale, bias),
            Some((scale, Bias::PerDimension(bias))) => match bias.as_slice() {
                [] => (scale, 0.0),
                [b] => (scale, *b),
                _ => bail!("multi-dimensional bias is not supported"),
            },
        };

        let required_features = trees
            .iter()
            .flat_map(|t| t.splits.iter().map(|&(f, _)| f + 1))
            .max()
            .unwrap_or(0);

        debug!(
            "catboost model: trees={}, scale={}, bias={}",
            trees.len(),
            scale,
            bias
        );

        Ok(CatBoostClassifier {
            trees,
            scale,
            bias,
            required_features,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw formula value: `scale * sum(leaves) + bias`.
    pub fn raw_value(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() < self.required_features {
            bail!(
                "catboost model splits on feature {} but only {} features were given",
                self.required_features - 1,
                features.len()
            );
        }
        let values = features.to_f32();
        let sum: f64 = self.trees.iter().map(|t| t.leaf_value(&values)).sum();
        Ok(self.scale * sum + self.bias)
    }
}

impl PromoterClassifier for CatBoostClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<Label> {
        let raw = self.raw_value(features)?;
        if raw.is_nan() {
            bail!("catboost model produced a NaN value");
        }
        Ok(Label::from_margin(raw))
    }

    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::GradientBoostedCbm
    }

    fn describe(&self) -> String {
        format!("catboost ({} oblivious trees)", self.trees.len())
    }
}

/// Loader for `.cbm` artifacts.
pub struct CatBoostLoader;

impl ArtifactLoader for CatBoostLoader {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::GradientBoostedCbm
    }

    fn load(&self, path: &Path) -> Result<Box<dyn PromoterClassifier>> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read model: {}", path.display()))?;
        if bytes.starts_with(CBM_MAGIC) {
            bail!(
                "{} is a binary CatBoost model; re-export it with save_model(path, format=\"json\")",
                path.display()
            );
        }
        let content = std::str::from_utf8(&bytes)
            .with_context(|| format!("CatBoost model is not UTF-8 JSON: {}", path.display()))?;
        let model = CatBoostClassifier::from_json_str(content)
            .with_context(|| format!("Failed to parse CatBoost model: {}", path.display()))?;
        Ok(Box::new(model))
    }
}
