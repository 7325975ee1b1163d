//! Per-organism model discovery and loading.
//!
//! Artifacts live under `<models_dir>/<organism>/<model_name>.<ext>`. Each file
//! is dispatched on its extension through a [`LoaderTable`]; files that fail to
//! load are logged and skipped, and an organism only counts as available when at
//! least one artifact loaded.
pub mod cache;

pub use cache::ModelCache;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use log::{debug, info, warn};

use crate::error::{ModelLoadError, PromoterError};
use crate::models::classifier_trait::PromoterClassifier;
use crate::models::factory::LoaderTable;

/// Loaded ensemble of one organism.
pub struct OrganismModels {
    pub organism: String,
    pub models: BTreeMap<String, Arc<dyn PromoterClassifier>>,
    /// Artifacts that were present but could not be used.
    pub skipped: Vec<ModelLoadError>,
}

impl OrganismModels {
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for OrganismModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrganismModels")
            .field("organism", &self.organism)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("skipped", &self.skipped.len())
            .finish()
    }
}

/// Reads classifier artifacts from a models root directory.
#[derive(Clone)]
pub struct ModelRegistry {
    root: PathBuf,
    loaders: LoaderTable,
}

impl ModelRegistry {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self::with_loaders(root, LoaderTable::default())
    }

    pub fn with_loaders<P: Into<PathBuf>>(root: P, loaders: LoaderTable) -> Self {
        Self {
            root: root.into(),
            loaders,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn loaders(&self) -> &LoaderTable {
        &self.loaders
    }

    /// Directory of an organism. Identifiers that could escape the models root
    /// resolve to nothing.
    pub fn organism_dir(&self, organism: &str) -> Option<PathBuf> {
        let mut components = Path::new(organism).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == organism => {
                Some(self.root.join(organism))
            }
            _ => None,
        }
    }

    /// Organism identifiers with a directory under the models root, sorted.
    pub fn list_organisms(&self) -> Result<Vec<String>, PromoterError> {
        let entries = fs::read_dir(&self.root).map_err(|source| PromoterError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut organisms = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Ignoring unreadable entry in {}: {}", self.root.display(), e);
                    continue;
                }
            };
            if !entry.path().is_dir() {
                continue;
            }
            match entry.file_name().to_str() {
                Some(name) => organisms.push(name.to_string()),
                None => debug!("Ignoring {} (name is not UTF-8)", entry.path().display()),
            }
        }
        organisms.sort();
        Ok(organisms)
    }

    /// Load every recognized artifact of an organism.
    pub fn load(&self, organism: &str) -> Result<OrganismModels, PromoterError> {
        let not_found = |path: PathBuf| PromoterError::ResourceNotFound {
            organism: organism.to_string(),
            path,
        };

        let dir = match self.organism_dir(organism) {
            Some(dir) => dir,
            None => {
                warn!("Rejected organism identifier {:?}", organism);
                return Err(not_found(self.root.clone()));
            }
        };
        if !dir.is_dir() {
            return Err(not_found(dir));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|source| PromoterError::Io {
                path: dir.clone(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        let mut models: BTreeMap<String, Arc<dyn PromoterClassifier>> = BTreeMap::new();
        let mut skipped = Vec::new();

        for path in files {
            let (Some(name), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                debug!("Ignoring {} (no extension)", path.display());
                continue;
            };

            let Some(loader) = self.loaders.get(ext) else {
                debug!("Ignoring {} (unrecognized extension)", path.display());
                continue;
            };

            if models.contains_key(name) {
                warn!(
                    "Skipping {}: a model named '{}' was already loaded",
                    path.display(),
                    name
                );
                skipped.push(ModelLoadError {
                    cause: anyhow!("duplicate model name '{}'", name),
                    file: path.clone(),
                });
                continue;
            }

            match loader.load(&path) {
                Ok(model) => {
                    debug!(
                        "Loaded {} as '{}' ({})",
                        path.display(),
                        name,
                        model.describe()
                    );
                    models.insert(name.to_string(), Arc::from(model));
                }
                Err(cause) => {
                    warn!("Error loading {}: {:#}", path.display(), cause);
                    skipped.push(ModelLoadError { file: path, cause });
                }
            }
        }

        if models.is_empty() {
            return Err(PromoterError::NoModelsAvailable {
                organism: organism.to_string(),
                failures: skipped,
            });
        }

        info!(
            "Loaded {} model(s) for {} ({} skipped)",
            models.len(),
            organism,
            skipped.len()
        );

        Ok(OrganismModels {
            organism: organism.to_string(),
            models,
            skipped,
        })
    }
}
