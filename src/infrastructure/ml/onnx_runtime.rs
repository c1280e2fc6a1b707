use crate::domain::errors::{InferenceError, ModelLoadError};
use crate::domain::ports::{DeclaredWindow, ModelInput, ModelRuntime};
use ort::session::Session;
use ort::value::ValueType;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// ONNX Runtime session behind the uniform runtime contract.
///
/// Sessions are not shared across threads without the lock; concurrent
/// requests serialise on it.
pub struct OnnxRuntime {
    session: Mutex<Session>,
    model_path: PathBuf,
    declared_window: Option<DeclaredWindow>,
}

impl OnnxRuntime {
    pub fn load(model_path: &Path) -> Result<Self, ModelLoadError> {
        let runtime_error = |reason: String| ModelLoadError::Runtime {
            path: model_path.to_path_buf(),
            reason,
        };

        let session = Session::builder()
            .map_err(|e| runtime_error(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| runtime_error(e.to_string()))?;

        let declared_window = session
            .inputs
            .first()
            .and_then(|input| match &input.input_type {
                ValueType::Tensor { shape: dimensions, .. } => window_from_dims(dimensions),
                _ => None,
            });

        info!(
            "Successfully loaded ONNX model from {:?} (input window {:?})",
            model_path, declared_window
        );
        Ok(Self {
            session: Mutex::new(session),
            model_path: model_path.to_path_buf(),
            declared_window,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

/// `[batch, T, F]` input dims; non-positive entries are dynamic axes.
fn window_from_dims(dims: &[i64]) -> Option<DeclaredWindow> {
    if dims.len() != 3 {
        return None;
    }
    let fixed = |d: i64| (d > 0).then_some(d as usize);
    let window = DeclaredWindow {
        timesteps: fixed(dims[1]),
        features: fixed(dims[2]),
    };
    (window != DeclaredWindow::default()).then_some(window)
}

impl ModelRuntime for OnnxRuntime {
    fn predict(&self, input: &ModelInput) -> Result<Vec<f64>, InferenceError> {
        let shape: Vec<usize> = input.shape().to_vec();
        let flat_data: Vec<f32> = input.iter().copied().collect();

        let input_value = ort::value::Value::from_array((shape.as_slice(), flat_data))
            .map_err(|e| InferenceError::Runtime(format!("Input value creation failed: {}", e)))?;

        let inputs = ort::inputs![input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Runtime(format!("Mutex lock failed: {}", e)))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or(InferenceError::EmptyOutput)?;
        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        Ok(data.1.iter().map(|v| *v as f64).collect())
    }

    fn name(&self) -> &str {
        "ONNX Runtime"
    }

    fn declared_window(&self) -> Option<DeclaredWindow> {
        self.declared_window
    }
}
