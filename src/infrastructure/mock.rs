//! Deterministic stand-ins for model runtimes, for tests and local runs
//! without trained artifacts.

use crate::domain::errors::{InferenceError, ModelLoadError};
use crate::domain::ports::{ModelInput, ModelLoader, ModelRuntime};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Runtime answering a fixed output and counting invocations
pub struct MockRuntime {
    name: String,
    output: Vec<f64>,
    declared_features: Option<usize>,
    calls: AtomicUsize,
}

impl MockRuntime {
    pub fn new(name: impl Into<String>, output: f64) -> Self {
        Self {
            name: name.into(),
            output: vec![output],
            declared_features: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_declared_features(mut self, features: usize) -> Self {
        self.declared_features = Some(features);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelRuntime for MockRuntime {
    fn predict(&self, input: &ModelInput) -> Result<Vec<f64>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!("MockRuntime {}: input shape {:?}", self.name, input.shape());
        Ok(self.output.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn declared_features(&self) -> Option<usize> {
        self.declared_features
    }
}

/// Loader resolving artifacts by file name to preregistered runtimes
#[derive(Default, Clone)]
pub struct MockModelLoader {
    runtimes: HashMap<String, Arc<MockRuntime>>,
}

impl MockModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runtime(mut self, file_name: impl Into<String>, runtime: Arc<MockRuntime>) -> Self {
        self.runtimes.insert(file_name.into(), runtime);
        self
    }
}

impl ModelLoader for MockModelLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn ModelRuntime>, ModelLoadError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self.runtimes.get(&file_name) {
            Some(runtime) => Ok(runtime.clone()),
            None => Err(ModelLoadError::Runtime {
                path: path.to_path_buf(),
                reason: "no mock runtime registered".to_string(),
            }),
        }
    }
}
