use crate::domain::ml::prediction::ModelRole;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate a single prediction request
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("historicalData is required and must include close prices")]
    MissingHistory,

    #[error(
        "Models are not loaded ({}). Place trained model files in MODEL_PATH and reload the service.",
        format_roles(.missing)
    )]
    ModelsNotReady { missing: Vec<ModelRole> },

    #[error("{role} inference failed: {source}")]
    Inference {
        role: ModelRole,
        #[source]
        source: InferenceError,
    },
}

/// Errors raised by a model runtime while evaluating one input
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Model returned an empty output")]
    EmptyOutput,

    #[error("Input has {actual} features, model expects {expected}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("Cannot build model input from an empty price series")]
    EmptySeries,
}

/// Errors raised while loading a model artifact.
///
/// These never abort startup: the registry records them per role.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("Model file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Unsupported model format for {}: expected .onnx or .json", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt model artifact {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Model runtime rejected {}: {reason}", .path.display())]
    Runtime { path: PathBuf, reason: String },
}

fn format_roles(roles: &[ModelRole]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
