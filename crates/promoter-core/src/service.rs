//! Request orchestration and the HTTP-style error contract.
use std::sync::Arc;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::ensemble::{EnsemblePredictor, PredictionResult};
use crate::error::PromoterError;
use crate::models::factory::LoaderTable;
use crate::registry::{ModelCache, ModelRegistry, OrganismModels};
use crate::sequence::{KappaEncoder, SequenceValidator};

/// Incoming prediction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub sequence: String,
    pub organism: String,
}

/// Error body returned for every non-200 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Status code plus JSON body, ready to hand to a transport.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl PredictionResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn error(status: u16, detail: impl Into<String>) -> Self {
        let body = ErrorBody {
            detail: detail.into(),
        };
        Self {
            status,
            body: serde_json::json!(body),
        }
    }
}

/// Where loaded models come from.
enum ModelSource {
    /// Rebuilt from disk on every request.
    Direct(ModelRegistry),
    Cached(ModelCache),
}

impl ModelSource {
    fn models(&self, organism: &str) -> Result<Arc<OrganismModels>, PromoterError> {
        match self {
            ModelSource::Direct(registry) => registry.load(organism).map(Arc::new),
            ModelSource::Cached(cache) => cache.get(organism),
        }
    }
}

/// validate -> encode -> load -> predict.
pub struct PredictionService {
    validator: SequenceValidator,
    encoder: KappaEncoder,
    source: ModelSource,
    ensemble: EnsemblePredictor,
}

impl PredictionService {
    pub fn new(config: &ServiceConfig) -> Self {
        let registry =
            ModelRegistry::with_loaders(&config.models_dir, LoaderTable::from_formats(&config.formats));
        let source = if config.cache_models {
            ModelSource::Cached(ModelCache::new(registry))
        } else {
            ModelSource::Direct(registry)
        };
        Self {
            validator: SequenceValidator::new(),
            encoder: KappaEncoder::new(),
            source,
            ensemble: EnsemblePredictor::new(config.ensemble_mode, config.parallel_inference),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        match &self.source {
            ModelSource::Direct(registry) => registry,
            ModelSource::Cached(cache) => cache.registry(),
        }
    }

    /// The model cache, when caching is enabled.
    pub fn cache(&self) -> Option<&ModelCache> {
        match &self.source {
            ModelSource::Cached(cache) => Some(cache),
            ModelSource::Direct(_) => None,
        }
    }

    pub fn models(&self, organism: &str) -> Result<Arc<OrganismModels>, PromoterError> {
        self.source.models(organism)
    }

    pub fn predict(&self, sequence: &str, organism: &str) -> Result<PredictionResult, PromoterError> {
        let sequence = self.validator.validate(sequence)?;
        let features = self.encoder.encode(&sequence)?;
        let models = self.source.models(organism)?;
        self.ensemble.run(&features, &models)
    }

    /// Run a request and map the outcome onto a status code and body.
    pub fn handle(&self, request: &PredictionRequest) -> PredictionResponse {
        match self.predict(&request.sequence, &request.organism) {
            Ok(result) => {
                info!(
                    "Predicted {} with {} model(s), {} positive",
                    result.organism,
                    result.predictions.len(),
                    result.positive_count()
                );
                PredictionResponse {
                    status: 200,
                    body: serde_json::json!(result),
                }
            }
            Err(err) => {
                let status = err.status();
                if status >= 500 {
                    error!(
                        "Prediction failed for {} at {} stage: {}",
                        request.organism,
                        err.stage(),
                        err
                    );
                    if let PromoterError::NoModelsAvailable { failures, .. } = &err {
                        for failure in failures {
                            error!("  {}", failure);
                        }
                    }
                } else {
                    info!("Rejected request for {} ({}): {}", request.organism, status, err);
                }
                PredictionResponse::error(status, err.public_message())
            }
        }
    }
}
