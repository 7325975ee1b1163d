//! XGBoost models saved with `save_model("*.json")`.
//!
//! Only the parts of the document needed for binary prediction are read: the
//! tree arrays of a `gbtree` booster, `learner_model_param.base_score` and the
//! objective name. Trees are evaluated in `f32`, as libxgboost does.
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use serde::Deserialize;

use crate::models::classifier_trait::{ArtifactFormat, Label, PromoterClassifier};
use crate::models::factory::ArtifactLoader;
use crate::sequence::FeatureVector;

#[derive(Deserialize)]
struct XGBoostDocument {
    learner: Learner,
    #[serde(default)]
    version: Vec<u32>,
}

#[derive(Deserialize)]
struct Learner {
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: ObjectiveDoc,
}

#[derive(Deserialize)]
struct GradientBooster {
    name: String,
    #[serde(default)]
    model: Option<GbTreeModel>,
}

#[derive(Deserialize)]
struct GbTreeModel {
    trees: Vec<TreeDoc>,
}

#[derive(Deserialize)]
struct LearnerModelParam {
    base_score: String,
    #[serde(default)]
    num_class: Option<String>,
}

#[derive(Deserialize)]
struct ObjectiveDoc {
    name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

#[derive(Deserialize)]
struct TreeDoc {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<i32>,
}

/// Objectives whose output is a binary decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Objective {
    /// `binary:logistic`, `reg:logistic`: base_score is a probability
    Logistic,
    /// `binary:logitraw`, `binary:hinge`: base_score is already a margin
    Raw,
}

impl Objective {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "binary:logistic" | "reg:logistic" => Ok(Objective::Logistic),
            "binary:logitraw" | "binary:hinge" => Ok(Objective::Raw),
            other => bail!("objective '{}' is not a binary classifier", other),
        }
    }
}

#[derive(Debug, Clone)]
struct RegTree {
    left: Vec<i32>,
    right: Vec<i32>,
    split_index: Vec<usize>,
    split_condition: Vec<f32>,
    default_left: Vec<bool>,
}

impl RegTree {
    fn from_doc(doc: TreeDoc, tree_id: usize) -> Result<Self> {
        let n = doc.left_children.len();
        if n == 0 {
            bail!("tree {} has no nodes", tree_id);
        }
        if doc.right_children.len() != n
            || doc.split_indices.len() != n
            || doc.split_conditions.len() != n
            || doc.default_left.len() != n
        {
            bail!("tree {} has inconsistent node arrays", tree_id);
        }
        if doc.split_type.iter().any(|&t| t != 0) {
            bail!("tree {} uses categorical splits, which are not supported", tree_id);
        }

        for node in 0..n {
            let (l, r) = (doc.left_children[node], doc.right_children[node]);
            if l == -1 {
                continue;
            }
            // children always follow their parent, which also rules out cycles
            for child in [l, r] {
                if child <= node as i32 || child as usize >= n {
                    bail!("tree {} node {} has invalid child {}", tree_id, node, child);
                }
            }
            if doc.split_indices[node] < 0 {
                bail!("tree {} node {} has a negative split index", tree_id, node);
            }
        }

        Ok(RegTree {
            left: doc.left_children,
            right: doc.right_children,
            split_index: doc.split_indices.iter().map(|&i| i.max(0) as usize).collect(),
            split_condition: doc.split_conditions,
            default_left: doc.default_left.iter().map(Flag::is_set).collect(),
        })
    }

    fn max_feature(&self) -> Option<usize> {
        (0..self.left.len())
            .filter(|&node| self.left[node] != -1)
            .map(|node| self.split_index[node])
            .max()
    }

    fn leaf_value(&self, features: &[f32]) -> f32 {
        let mut node = 0usize;
        while self.left[node] != -1 {
            let value = features[self.split_index[node]];
            let go_left = if value.is_nan() {
                self.default_left[node]
            } else {
                value < self.split_condition[node]
            };
            node = if go_left {
                self.left[node] as usize
            } else {
                self.right[node] as usize
            };
        }
        self.split_condition[node]
    }
}

/// Binary XGBoost tree ensemble.
pub struct XGBoostClassifier {
    trees: Vec<RegTree>,
    base_margin: f32,
    objective: Objective,
    required_features: usize,
}

impl XGBoostClassifier {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let doc: XGBoostDocument = serde_json::from_str(content)?;
        let learner = doc.learner;

        if learner.gradient_booster.name != "gbtree" {
            bail!(
                "booster '{}' is not supported, expected gbtree",
                learner.gradient_booster.name
            );
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| anyhow!("gbtree booster has no model section"))?;

        if let Some(num_class) = &learner.learner_model_param.num_class {
            let num_class: u32 = num_class
                .trim()
                .parse()
                .with_context(|| format!("invalid num_class '{}'", num_class))?;
            if num_class > 1 {
                bail!("multi-class model with {} classes is not a binary classifier", num_class);
            }
        }

        let objective = Objective::parse(&learner.objective.name)?;
        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;
        let base_margin = match objective {
            Objective::Logistic => {
                if !(base_score > 0.0 && base_score < 1.0) {
                    bail!("base_score {} is not a probability", base_score);
                }
                -(1.0 / base_score - 1.0).ln()
            }
            Objective::Raw => base_score,
        };

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| RegTree::from_doc(t, i))
            .collect::<Result<Vec<_>>>()?;
        let required_features = trees
            .iter()
            .filter_map(RegTree::max_feature)
            .max()
            .map_or(0, |m| m + 1);

        debug!(
            "xgboost model: version={:?}, trees={}, objective={:?}, base_margin={}",
            doc.version,
            trees.len(),
            objective,
            base_margin
        );

        Ok(XGBoostClassifier {
            trees,
            base_margin,
            objective,
            required_features,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw margin (log-odds for logistic objectives).
    pub fn margin(&self, features: &FeatureVector) -> Result<f32> {
        if features.len() < self.required_features {
            bail!(
                "xgboost model splits on feature {} but only {} features were given",
                self.required_features - 1,
                features.len()
            );
        }
        let values = features.to_f32();
        let sum: f32 = self.trees.iter().map(|t| t.leaf_value(&values)).sum();
        Ok(sum + self.base_margin)
    }
}

/// base_score is written as `"5E-1"` or, by newer releases, `"[5E-1]"`.
fn parse_base_score(raw: &str) -> Result<f32> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    trimmed
        .parse::<f32>()
        .with_context(|| format!("invalid base_score '{}'", raw))
}

impl PromoterClassifier for XGBoostClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<Label> {
        let margin = self.margin(features)?;
        if margin.is_nan() {
            bail!("xgboost model produced a NaN margin");
        }
        Ok(Label::from_margin(margin as f64))
    }

    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::GradientBoostedJson
    }

    fn describe(&self) -> String {
        let objective = match self.objective {
            Objective::Logistic => "logistic",
            Objective::Raw => "raw",
        };
        format!("xgboost ({} trees, {})", self.trees.len(), objective)
    }
}

/// Loader for XGBoost JSON documents.
pub struct XGBoostJsonLoader;

impl ArtifactLoader for XGBoostJsonLoader {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::GradientBoostedJson
    }

    fn load(&self, path: &Path) -> Result<Box<dyn PromoterClassifier>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model: {}", path.display()))?;
        let model = XGBoostClassifier::from_json_str(&content)
            .with_context(|| format!("Failed to parse XGBoost model: {}", path.display()))?;
        Ok(Box::new(model))
    }
}
