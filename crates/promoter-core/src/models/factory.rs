use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::models::catboost::CatBoostLoader;
use crate::models::classifier_trait::{ArtifactFormat, PromoterClassifier};
use crate::models::serialized::SerializedLoader;
use crate::models::xgboost::XGBoostJsonLoader;

/// Builds a classifier from one artifact file.
pub trait ArtifactLoader: Send + Sync {
    fn format(&self) -> ArtifactFormat;

    fn load(&self, path: &Path) -> Result<Box<dyn PromoterClassifier>>;
}

/// Build the stock loader for a format.
pub fn loader_for(format: ArtifactFormat) -> Arc<dyn ArtifactLoader> {
    match format {
        ArtifactFormat::GenericSerialized => Arc::new(SerializedLoader),
        ArtifactFormat::GradientBoostedJson => Arc::new(XGBoostJsonLoader),
        ArtifactFormat::GradientBoostedCbm => Arc::new(CatBoostLoader),
    }
}

/// Extension-keyed dispatch table used by the registry.
///
/// Extensions are matched case-insensitively and without the leading dot.
#[derive(Clone)]
pub struct LoaderTable {
    loaders: BTreeMap<String, Arc<dyn ArtifactLoader>>,
}

impl Default for LoaderTable {
    fn default() -> Self {
        Self::from_formats(&default_formats())
    }
}

/// The stock extension table: `model`, `json` and `cbm`.
pub fn default_formats() -> BTreeMap<String, ArtifactFormat> {
    BTreeMap::from([
        ("model".to_string(), ArtifactFormat::GenericSerialized),
        ("json".to_string(), ArtifactFormat::GradientBoostedJson),
        ("cbm".to_string(), ArtifactFormat::GradientBoostedCbm),
    ])
}

impl LoaderTable {
    pub fn empty() -> Self {
        Self {
            loaders: BTreeMap::new(),
        }
    }

    pub fn from_formats(formats: &BTreeMap<String, ArtifactFormat>) -> Self {
        let mut table = Self::empty();
        for (ext, format) in formats {
            table.register(ext, loader_for(*format));
        }
        table
    }

    /// Add or replace the loader for an extension.
    pub fn register(&mut self, extension: &str, loader: Arc<dyn ArtifactLoader>) -> &mut Self {
        self.loaders.insert(normalize(extension), loader);
        self
    }

    pub fn get(&self, extension: &str) -> Option<&Arc<dyn ArtifactLoader>> {
        self.loaders.get(&normalize(extension))
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}
