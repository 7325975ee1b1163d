use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info};
use once_cell::sync::OnceCell;

use crate::error::PromoterError;
use crate::registry::{ModelRegistry, OrganismModels};

type Slot = Arc<OnceCell<Arc<OrganismModels>>>;

/// Keeps loaded ensembles per organism.
///
/// The map lock is only held to find or create an organism's slot; loading runs
/// inside the slot's `OnceCell`, so concurrent first requests for one organism
/// share a single load while other organisms proceed. Failed loads leave the
/// slot empty and are retried on the next request.
pub struct ModelCache {
    registry: ModelRegistry,
    slots: Mutex<HashMap<String, Slot>>,
}

impl ModelCache {
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    fn slot(&self, organism: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(organism.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    pub fn get(&self, organism: &str) -> Result<Arc<OrganismModels>, PromoterError> {
        let slot = self.slot(organism);
        if let Some(models) = slot.get() {
            debug!("Model cache hit for {}", organism);
            return Ok(Arc::clone(models));
        }
        let loaded = slot.get_or_try_init(|| {
            debug!("Model cache miss for {}", organism);
            self.registry.load(organism).map(Arc::new)
        });
        match loaded {
            Ok(models) => Ok(Arc::clone(models)),
            Err(err) => {
                self.release_empty(organism, &slot);
                Err(err)
            }
        }
    }

    /// Drop the slot of a failed load so unknown organisms do not accumulate.
    /// A slot that was replaced or filled meanwhile is left alone.
    fn release_empty(&self, organism: &str, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let stale = slots
            .get(organism)
            .map_or(false, |current| Arc::ptr_eq(current, slot) && current.get().is_none());
        if stale {
            slots.remove(organism);
        }
    }

    /// Number of organisms with a slot, loaded or loading.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop one organism; the next request reloads it from disk.
    pub fn invalidate(&self, organism: &str) -> bool {
        let removed = self
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(organism)
            .is_some();
        if removed {
            info!("Invalidated cached models for {}", organism);
        }
        removed
    }

    pub fn clear(&self) {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).clear();
        info!("Cleared model cache");
    }

    /// Organisms whose models are currently loaded, sorted.
    pub fn cached_organisms(&self) -> Vec<String> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let mut organisms: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        organisms.sort();
        organisms
    }
}
