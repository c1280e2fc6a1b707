use super::onnx_runtime::OnnxRuntime;
use super::tree_ensemble::TreeEnsemble;
use crate::domain::errors::ModelLoadError;
use crate::domain::ports::{ModelLoader, ModelRuntime};
use std::path::Path;
use std::sync::Arc;

/// Picks a runtime backend from the artifact's file extension:
/// `.onnx` → ONNX Runtime session, `.json` → XGBoost tree ensemble.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileModelLoader;

impl ModelLoader for FileModelLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn ModelRuntime>, ModelLoadError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("onnx") => Ok(Arc::new(OnnxRuntime::load(path)?)),
            Some("json") => Ok(Arc::new(TreeEnsemble::load(path)?)),
            _ => Err(ModelLoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}
