use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError},
    time::Instant,
};

use tracing::{debug, info, warn};

use crate::{
    Error, ModelId, Network, NetworkLoadError, Result, SequentialNetwork,
    storage::default_models_dir,
};

type NetworkSlot = Mutex<Option<Arc<dyn Network>>>;

/// Maps model identifiers to loaded networks.
///
/// Each network is loaded from `<models_dir>/<stem>.safetensors` the first
/// time it is requested and shared afterwards. Every model has its own slot:
/// concurrent first requests for one model wait for a single load, while
/// requests for other models proceed. Failed loads are not cached.
pub struct ModelResolver {
    models_dir: PathBuf,
    slots: [NetworkSlot; ModelId::COUNT],
}

impl Default for ModelResolver {
    fn default() -> Self {
        Self::new(default_models_dir())
    }
}

impl ModelResolver {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            slots: std::array::from_fn(|_| Mutex::new(None)),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn weights_path(
        &self,
        model: ModelId,
    ) -> PathBuf {
        self.models_dir.join(model.weights_file_name())
    }

    pub fn resolve(
        &self,
        model: ModelId,
    ) -> Result<Arc<dyn Network>> {
        let mut slot = self.lock_slot(model);
        if let Some(network) = slot.as_ref() {
            debug!(%model, "Using cached network");
            return Ok(network.clone());
        }

        let network = self.load(model)?;
        *slot = Some(network.clone());
        Ok(network)
    }

    /// Parses `name` before resolving it; unknown names never reach the file
    /// system.
    pub fn resolve_by_name(
        &self,
        name: &str,
    ) -> Result<Arc<dyn Network>> {
        let model: ModelId = name.parse()?;
        self.resolve(model)
    }

    /// Installs an already-built network, replacing any cached one.
    pub fn register(
        &self,
        model: ModelId,
        network: Arc<dyn Network>,
    ) -> Result<()> {
        check_label_count(model, network.as_ref()).map_err(|source| {
            Error::ModelLoad {
                model,
                source,
            }
        })?;
        *self.lock_slot(model) = Some(network);
        Ok(())
    }

    /// Loads every listed model up front, stopping at the first failure.
    pub fn preload(
        &self,
        models: &[ModelId],
    ) -> Result<()> {
        for &model in models {
            self.resolve(model)?;
        }
        Ok(())
    }

    pub fn preload_all(&self) -> Result<()> {
        self.preload(&ModelId::ALL)
    }

    /// A model whose load is still in progress reports `false` without
    /// waiting for it.
    pub fn is_loaded(
        &self,
        model: ModelId,
    ) -> bool {
        match self.slots[model.index()].try_lock() {
            Ok(slot) => slot.is_some(),
            Err(TryLockError::Poisoned(poisoned)) => {
                poisoned.into_inner().is_some()
            },
            Err(TryLockError::WouldBlock) => false,
        }
    }

    pub fn loaded_models(&self) -> Vec<ModelId> {
        ModelId::ALL
            .into_iter()
            .filter(|&model| self.is_loaded(model))
            .collect()
    }

    fn load(
        &self,
        model: ModelId,
    ) -> Result<Arc<dyn Network>> {
        let path = self.weights_path(model);
        let load_start = Instant::now();
        let network = SequentialNetwork::load(&path)
            .and_then(|network| {
                check_label_count(model, &network)?;
                Ok(network)
            })
            .map_err(|source| {
                warn!(
                    %model,
                    path = %path.display(),
                    error = %source,
                    "Failed to load network"
                );
                Error::ModelLoad {
                    model,
                    source,
                }
            })?;
        info!(
            %model,
            path = %path.display(),
            network = network.name(),
            duration = load_start.elapsed().as_secs_f64(),
            "Loaded network"
        );
        Ok(Arc::new(network))
    }

    fn lock_slot(
        &self,
        model: ModelId,
    ) -> MutexGuard<'_, Option<Arc<dyn Network>>> {
        // A slot only ever holds a fully built network, so a panic while the
        // lock was held cannot leave it half-updated.
        self.slots[model.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn check_label_count(
    model: ModelId,
    network: &dyn Network,
) -> std::result::Result<(), NetworkLoadError> {
    if network.num_outputs() != model.num_labels() {
        return Err(NetworkLoadError::LabelCountMismatch {
            expected: model.num_labels(),
            actual: network.num_outputs(),
        });
    }
    Ok(())
}
