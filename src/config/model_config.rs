//! Model artifact configuration parsing from environment variables.
//!
//! Resolves one file per role under `MODEL_PATH` together with the adapter
//! shape each role is fed with.

use crate::application::ml::adapter::{AdapterSpec, ModelSource};
use crate::application::ml::windowed_adapter::WindowShape;
use crate::domain::ml::prediction::ModelRole;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Model environment configuration
#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    pub model_path: PathBuf,
    pub lstm_file: String,
    pub transformer_file: String,
    pub xgboost_file: String,
    pub lstm_window: WindowShape,
    pub transformer_window: WindowShape,
    /// Used only when the tree artifact does not declare its width
    pub xgboost_features: usize,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models"),
            lstm_file: "lstm.onnx".to_string(),
            transformer_file: "transformer.onnx".to_string(),
            xgboost_file: "xgboost.json".to_string(),
            lstm_window: WindowShape::default(),
            transformer_window: WindowShape::default(),
            xgboost_features: 3,
        }
    }
}

impl ModelEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            lstm_file: env::var("LSTM_MODEL_FILE").unwrap_or(defaults.lstm_file),
            transformer_file: env::var("TRANSFORMER_MODEL_FILE")
                .unwrap_or(defaults.transformer_file),
            xgboost_file: env::var("XGBOOST_MODEL_FILE").unwrap_or(defaults.xgboost_file),
            lstm_window: WindowShape {
                timesteps: Self::parse_usize("LSTM_WINDOW", defaults.lstm_window.timesteps)?,
                features: Self::parse_usize("LSTM_FEATURES", defaults.lstm_window.features)?,
            },
            transformer_window: WindowShape {
                timesteps: Self::parse_usize(
                    "TRANSFORMER_WINDOW",
                    defaults.transformer_window.timesteps,
                )?,
                features: Self::parse_usize(
                    "TRANSFORMER_FEATURES",
                    defaults.transformer_window.features,
                )?,
            },
            xgboost_features: Self::parse_usize("XGBOOST_FEATURES", defaults.xgboost_features)?,
        })
    }

    /// Load plan for all three roles
    pub fn sources(&self) -> Vec<ModelSource> {
        ModelRole::ALL
            .into_iter()
            .map(|role| ModelSource {
                role,
                path: self.model_path.join(self.file_for(role)),
                spec: self.spec_for(role),
            })
            .collect()
    }

    fn file_for(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Lstm => &self.lstm_file,
            ModelRole::Xgboost => &self.xgboost_file,
            ModelRole::Transformer => &self.transformer_file,
        }
    }

    fn spec_for(&self, role: ModelRole) -> AdapterSpec {
        match role {
            ModelRole::Lstm => AdapterSpec::WindowedSequence(self.lstm_window),
            ModelRole::Transformer => AdapterSpec::WindowedSequence(self.transformer_window),
            ModelRole::Xgboost => AdapterSpec::Tabular {
                features: self.xgboost_features,
            },
        }
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }
}
