//! Request orchestration: series extraction, readiness, adapters, consensus.

use crate::application::ml::adapter::{ModelHandle, ModelSource};
use crate::application::ml::registry::{ModelRegistry, ModelsStatus};
use crate::domain::errors::ForecastError;
use crate::domain::market::series::{HistoricalBar, PriceSeries, extract_series};
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ml::consensus::{self, RolePrices};
use crate::domain::ml::prediction::{ConsensusResult, ModelPrediction, RolePredictions};
use crate::domain::ports::ModelLoader;
use crate::infrastructure::observability::Metrics;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    #[serde(default)]
    pub historical_data: Option<Vec<HistoricalBar>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub predictions: RolePredictions,
    pub consensus: ConsensusResult,
}

/// Entry point for predictions and model status.
///
/// Requests take a snapshot of the current registry and never mutate it;
/// `reload` swaps in a freshly built registry under the write lock.
pub struct ForecastService {
    registry: RwLock<Arc<ModelRegistry>>,
    sources: Vec<ModelSource>,
    loader: Arc<dyn ModelLoader>,
    metrics: Option<Metrics>,
}

impl ForecastService {
    /// Load every configured model once. Failures are recorded, not returned.
    pub fn load(sources: Vec<ModelSource>, loader: Arc<dyn ModelLoader>) -> Self {
        let registry = ModelRegistry::load(&sources, loader.as_ref());
        Self {
            registry: RwLock::new(Arc::new(registry)),
            sources,
            loader,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        metrics.set_models_loaded(&self.status());
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Current registry snapshot
    pub fn registry(&self) -> Arc<ModelRegistry> {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn status(&self) -> ModelsStatus {
        self.registry().status()
    }

    /// Rebuild the registry from the configured sources and replace it whole.
    /// In-flight requests finish on the registry they started with.
    pub fn reload(&self) -> ModelsStatus {
        info!("Reloading {} model sources", self.sources.len());
        let fresh = Arc::new(ModelRegistry::load(&self.sources, self.loader.as_ref()));
        let status = fresh.status();

        *self.registry.write().unwrap_or_else(|e| e.into_inner()) = fresh;

        if let Some(metrics) = &self.metrics {
            metrics.set_models_loaded(&status);
        }
        status
    }

    pub fn predict(&self, request: &PredictRequest) -> Result<PredictResponse, ForecastError> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "predict",
            %request_id,
            symbol = %request.symbol,
            timeframe = %request.timeframe,
            horizon_days = request.timeframe.to_days()
        );
        let _enter = span.enter();

        let result = self.run(request);
        if let Some(metrics) = &self.metrics {
            metrics.inc_predictions(outcome_label(&result));
        }
        result
    }

    fn run(&self, request: &PredictRequest) -> Result<PredictResponse, ForecastError> {
        let (series, current) = extract_series(request.historical_data.as_deref());
        if series.is_empty() {
            warn!("Rejected request without usable close prices");
            return Err(ForecastError::MissingHistory);
        }

        let registry = self.registry();
        let models = registry.ready().inspect_err(|e| warn!("{}", e))?;

        let lstm_price = self.invoke(models.lstm, &series)?;
        let transformer_price = self.invoke(models.transformer, &series)?;
        let xgboost_price = self.invoke(models.xgboost, &series)?;

        let consensus = consensus::combine(
            &RolePrices {
                lstm: lstm_price,
                xgboost: xgboost_price,
                transformer: transformer_price,
            },
            current,
        );

        let predictions = RolePredictions {
            lstm: describe(models.lstm, lstm_price, current),
            xgboost: describe(models.xgboost, xgboost_price, current),
            transformer: describe(models.transformer, transformer_price, current)
                .with_attention_weights(Vec::new()),
        };

        info!(
            "Consensus {:.4} ({:+.3}%, confidence {:.2}) from {} closes",
            consensus.price,
            consensus.change_percent,
            consensus.confidence,
            series.len()
        );

        Ok(PredictResponse {
            symbol: request.symbol.clone(),
            timeframe: request.timeframe,
            predictions,
            consensus,
        })
    }

    fn invoke(&self, handle: &ModelHandle, series: &PriceSeries) -> Result<f64, ForecastError> {
        let started = Instant::now();
        let result = handle.adapter.predict(series);
        let elapsed = started.elapsed().as_secs_f64();

        if let Some(metrics) = &self.metrics {
            metrics.observe_inference(handle.role, elapsed);
        }

        let price = result.map_err(|source| ForecastError::Inference {
            role: handle.role,
            source,
        })?;
        debug!("{} predicted {:.4} in {:.2}ms", handle.role, price, elapsed * 1000.0);
        Ok(price)
    }
}

fn describe(handle: &ModelHandle, price: f64, current: f64) -> ModelPrediction {
    let prediction = ModelPrediction::new(price, handle.role.base_confidence())
        .with_direction(consensus::direction(current, price));

    match handle.adapter.feature_importance() {
        Some(importance) => prediction.with_feature_importance(importance),
        None => prediction,
    }
}

fn outcome_label(result: &Result<PredictResponse, ForecastError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(ForecastError::MissingHistory) => "invalid_input",
        Err(ForecastError::ModelsNotReady { .. }) => "not_ready",
        Err(ForecastError::Inference { .. }) => "inference_error",
    }
}
