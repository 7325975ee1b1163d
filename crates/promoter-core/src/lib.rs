//! promoter-core: ensemble promoter prediction for fixed-length DNA sequences.
//!
//! This crate provides the sequence validator and the kappa feature encoder,
//! loaders for classifier artifacts stored in three formats (serde-serialized
//! models, XGBoost JSON, CatBoost models), a per-organism model registry with
//! an optional cache, the reporting ensemble, and the prediction service that
//! maps failures onto an HTTP-style status contract.
//!
//! Each organism owns a directory of artifacts under a models root; every
//! artifact is queried separately and its 0/1 label is reported by name.
pub mod config;
pub mod ensemble;
pub mod error;
pub mod models;
pub mod registry;
pub mod sequence;
pub mod service;

pub use config::{EnsembleMode, ServiceConfig};
pub use ensemble::{EnsemblePredictor, PredictionResult};
pub use error::{ModelLoadError, PromoterError, Stage};
pub use models::classifier_trait::{ArtifactFormat, Label, PromoterClassifier};
pub use registry::{ModelCache, ModelRegistry, OrganismModels};
pub use sequence::{FeatureVector, KappaEncoder, Sequence, SequenceValidator};
pub use service::{PredictionRequest, PredictionResponse, PredictionService};
