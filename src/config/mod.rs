//! Configuration module for Novacast.
//!
//! Structured configuration loading from environment variables, organized by
//! concern: Models, Server, and Observability.

mod model_config;
mod observability_config;
mod server_config;

pub use model_config::ModelEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use server_config::ServerEnvConfig;

use crate::application::ml::adapter::ModelSource;
use anyhow::{Context, Result};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub models: ModelEnvConfig,
    pub server: ServerEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a local `.env`.
    pub fn from_env() -> Result<Self> {
        let models = ModelEnvConfig::from_env().context("Failed to load model config")?;
        let server = ServerEnvConfig::from_env().context("Failed to load server config")?;
        let observability = ObservabilityEnvConfig::from_env();

        Ok(Self {
            models,
            server,
            observability,
        })
    }

    pub fn model_sources(&self) -> Vec<ModelSource> {
        self.models.sources()
    }
}
