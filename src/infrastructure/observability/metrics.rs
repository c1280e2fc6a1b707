//! Prometheus metrics definitions for Novacast
//!
//! All metrics use the `novacast_` prefix and are read-only.

use crate::application::ml::registry::ModelsStatus;
use crate::domain::ml::prediction::ModelRole;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus metrics for the forecasting service
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Prediction requests by outcome
    pub predictions_total: CounterVec,
    /// Model invocation latency in seconds
    pub inference_latency_seconds: HistogramVec,
    /// Load state per model role (0=missing, 1=loaded)
    pub models_loaded: GaugeVec,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let predictions_total = CounterVec::new(
            Opts::new("novacast_predictions_total", "Prediction requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let inference_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "novacast_inference_latency_seconds",
                "Model invocation latency in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0,
            ]),
            &["model"],
        )?;
        registry.register(Box::new(inference_latency_seconds.clone()))?;

        let models_loaded = GaugeVec::new(
            Opts::new(
                "novacast_models_loaded",
                "Model load state per role (0=missing, 1=loaded)",
            ),
            &["model"],
        )?;
        registry.register(Box::new(models_loaded.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            predictions_total,
            inference_latency_seconds,
            models_loaded,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    /// Increment prediction counter
    pub fn inc_predictions(&self, outcome: &str) {
        self.predictions_total.with_label_values(&[outcome]).inc();
    }

    /// Observe one model invocation
    pub fn observe_inference(&self, role: ModelRole, latency: f64) {
        self.inference_latency_seconds
            .with_label_values(&[role.as_str()])
            .observe(latency);
    }

    /// Mirror the registry's load state
    pub fn set_models_loaded(&self, status: &ModelsStatus) {
        for role in ModelRole::ALL {
            let loaded = if status.get(role).loaded { 1.0 } else { 0.0 };
            self.models_loaded
                .with_label_values(&[role.as_str()])
                .set(loaded);
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default Metrics")
    }
}
