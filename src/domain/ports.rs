use crate::domain::errors::{InferenceError, ModelLoadError};
use ndarray::ArrayD;
use std::path::Path;
use std::sync::Arc;

/// Dense row-major tensor handed to a model runtime.
///
/// Sequence models receive `(1, T, F)`, tabular models `(1, N)`.
pub type ModelInput = ArrayD<f32>;

/// Sequence input geometry as declared by an artifact.
///
/// `None` marks a dynamic dimension, left to configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclaredWindow {
    pub timesteps: Option<usize>,
    pub features: Option<usize>,
}

/// Opaque predictor: fixed-shape numeric input in, numeric output out.
pub trait ModelRuntime: Send + Sync {
    /// Evaluate one input and return the flattened output.
    fn predict(&self, input: &ModelInput) -> Result<Vec<f64>, InferenceError>;

    /// Get runtime name/type
    fn name(&self) -> &str;

    /// Input width declared by the artifact itself, if it carries one.
    ///
    /// Read once at load time to configure the adapter.
    fn declared_features(&self) -> Option<usize> {
        None
    }

    /// `(1, T, F)` geometry fixed by the artifact, if any.
    fn declared_window(&self) -> Option<DeclaredWindow> {
        None
    }

    /// Relative importance per input column, when the runtime can describe it.
    fn feature_importance(&self) -> Option<Vec<f64>> {
        None
    }
}

/// Turns a model artifact on disk into a runtime
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn ModelRuntime>, ModelLoadError>;
}
