use super::tabular_adapter::TabularAdapter;
use super::windowed_adapter::{WindowShape, WindowedSequenceAdapter};
use crate::domain::errors::InferenceError;
use crate::domain::market::series::PriceSeries;
use crate::domain::ml::prediction::ModelRole;
use crate::domain::ports::ModelRuntime;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// How a role's runtime is fed, configured before the artifact is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterSpec {
    WindowedSequence(WindowShape),
    /// `features` applies only when the artifact declares no width of its own
    Tabular { features: usize },
}

/// Where and how to load one role
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSource {
    pub role: ModelRole,
    pub path: PathBuf,
    pub spec: AdapterSpec,
}

/// A runtime bound to the adapter that builds its inputs
#[derive(Clone)]
pub enum ModelAdapter {
    WindowedSequence(WindowedSequenceAdapter),
    Tabular(TabularAdapter),
}

impl ModelAdapter {
    /// Bind a freshly loaded runtime; whatever the artifact declares about
    /// its input wins over the configured shape, dimension by dimension.
    pub fn bind(runtime: Arc<dyn ModelRuntime>, spec: AdapterSpec) -> Self {
        match spec {
            AdapterSpec::WindowedSequence(configured) => {
                let shape = match runtime.declared_window() {
                    Some(declared) => WindowShape {
                        timesteps: declared.timesteps.unwrap_or(configured.timesteps),
                        features: declared.features.unwrap_or(configured.features),
                    },
                    None => configured,
                };
                ModelAdapter::WindowedSequence(WindowedSequenceAdapter::new(runtime, shape))
            }
            AdapterSpec::Tabular { features } => {
                let width = runtime.declared_features().unwrap_or(features);
                ModelAdapter::Tabular(TabularAdapter::new(runtime, width))
            }
        }
    }

    pub fn predict(&self, series: &PriceSeries) -> Result<f64, InferenceError> {
        match self {
            ModelAdapter::WindowedSequence(a) => a.predict(series),
            ModelAdapter::Tabular(a) => a.predict(series),
        }
    }

    pub fn runtime_name(&self) -> &str {
        match self {
            ModelAdapter::WindowedSequence(a) => a.runtime_name(),
            ModelAdapter::Tabular(a) => a.runtime_name(),
        }
    }

    /// Named input importance; only tabular models report one.
    pub fn feature_importance(&self) -> Option<BTreeMap<String, f64>> {
        match self {
            ModelAdapter::WindowedSequence(_) => None,
            ModelAdapter::Tabular(a) => Some(a.feature_importance()),
        }
    }
}

/// Loaded model owned by the registry
#[derive(Clone)]
pub struct ModelHandle {
    pub role: ModelRole,
    pub adapter: ModelAdapter,
    pub source: PathBuf,
    pub loaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("role", &self.role)
            .field("runtime", &self.adapter.runtime_name())
            .field("source", &self.source)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}
