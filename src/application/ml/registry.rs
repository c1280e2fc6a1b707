//! Registry of the loaded model roles.
//!
//! Built once from the configured sources and read-only afterwards. A reload
//! builds a new registry and replaces the old one as a whole.

use super::adapter::{ModelAdapter, ModelHandle, ModelSource};
use crate::domain::errors::{ForecastError, ModelLoadError};
use crate::domain::ml::prediction::ModelRole;
use crate::domain::ports::ModelLoader;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Provenance of the last load pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadMetadata {
    pub loaded_at: DateTime<Utc>,
    pub paths: BTreeMap<ModelRole, PathBuf>,
    pub errors: BTreeMap<ModelRole, String>,
}

/// Status of one role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub file: Option<PathBuf>,
}

/// Status of every role plus load metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsStatus {
    pub lstm: ModelStatus,
    pub xgboost: ModelStatus,
    pub transformer: ModelStatus,
    pub meta: LoadMetadata,
}

impl ModelsStatus {
    pub fn get(&self, role: ModelRole) -> &ModelStatus {
        match role {
            ModelRole::Lstm => &self.lstm,
            ModelRole::Xgboost => &self.xgboost,
            ModelRole::Transformer => &self.transformer,
        }
    }
}

/// All three handles, only obtainable from a fully loaded registry
#[derive(Debug, Clone, Copy)]
pub struct ReadyModels<'a> {
    pub lstm: &'a ModelHandle,
    pub xgboost: &'a ModelHandle,
    pub transformer: &'a ModelHandle,
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    handles: BTreeMap<ModelRole, ModelHandle>,
    meta: LoadMetadata,
}

impl ModelRegistry {
    /// Registry with nothing loaded
    pub fn empty() -> Self {
        Self {
            handles: BTreeMap::new(),
            meta: LoadMetadata {
                loaded_at: Utc::now(),
                paths: BTreeMap::new(),
                errors: BTreeMap::new(),
            },
        }
    }

    /// Best-effort load of every source. A failing role is recorded and skipped.
    pub fn load(sources: &[ModelSource], loader: &dyn ModelLoader) -> Self {
        let mut registry = Self::empty();

        for source in sources {
            registry.meta.paths.insert(source.role, source.path.clone());

            match Self::load_one(source, loader) {
                Ok(handle) => {
                    info!(
                        "Loaded {} model from {:?} ({})",
                        source.role,
                        source.path,
                        handle.adapter.runtime_name()
                    );
                    registry.handles.insert(source.role, handle);
                }
                Err(e @ ModelLoadError::NotFound { .. }) => {
                    warn!("{} model unavailable: {}", source.role, e);
                    registry.meta.errors.insert(source.role, e.to_string());
                }
                Err(e) => {
                    error!("Failed to load {} model: {}", source.role, e);
                    registry.meta.errors.insert(source.role, e.to_string());
                }
            }
        }

        let missing = registry.missing_roles();
        if missing.is_empty() {
            info!("All {} models loaded", ModelRole::ALL.len());
        } else {
            warn!(
                "Model registry incomplete, predictions disabled until reload. Missing: {:?}",
                missing
            );
        }

        registry
    }

    fn load_one(source: &ModelSource, loader: &dyn ModelLoader) -> Result<ModelHandle, ModelLoadError> {
        if !source.path.exists() {
            return Err(ModelLoadError::NotFound {
                path: source.path.clone(),
            });
        }

        let runtime = loader.load(&source.path)?;
        Ok(ModelHandle {
            role: source.role,
            adapter: ModelAdapter::bind(runtime, source.spec),
            source: source.path.clone(),
            loaded_at: Utc::now(),
        })
    }

    pub fn get(&self, role: ModelRole) -> Option<&ModelHandle> {
        self.handles.get(&role)
    }

    pub fn is_loaded(&self, role: ModelRole) -> bool {
        self.handles.contains_key(&role)
    }

    pub fn missing_roles(&self) -> Vec<ModelRole> {
        ModelRole::ALL
            .into_iter()
            .filter(|role| !self.is_loaded(*role))
            .collect()
    }

    /// All-or-nothing readiness check
    pub fn ready(&self) -> Result<ReadyModels<'_>, ForecastError> {
        match (
            self.get(ModelRole::Lstm),
            self.get(ModelRole::Xgboost),
            self.get(ModelRole::Transformer),
        ) {
            (Some(lstm), Some(xgboost), Some(transformer)) => Ok(ReadyModels {
                lstm,
                xgboost,
                transformer,
            }),
            _ => Err(ForecastError::ModelsNotReady {
                missing: self.missing_roles(),
            }),
        }
    }

    pub fn metadata(&self) -> &LoadMetadata {
        &self.meta
    }

    pub fn status(&self) -> ModelsStatus {
        let role_status = |role: ModelRole| ModelStatus {
            loaded: self.is_loaded(role),
            file: self.meta.paths.get(&role).cloned(),
        };

        ModelsStatus {
            lstm: role_status(ModelRole::Lstm),
            xgboost: role_status(ModelRole::Xgboost),
            transformer: role_status(ModelRole::Transformer),
            meta: self.meta.clone(),
        }
    }
}
