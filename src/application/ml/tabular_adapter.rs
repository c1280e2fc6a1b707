use crate::domain::errors::InferenceError;
use crate::domain::market::series::PriceSeries;
use crate::domain::ml::feature_registry::{self, FEATURE_NAMES, TabularFeatures};
use crate::domain::ports::{ModelInput, ModelRuntime};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Feeds `[last price, mean return, volatility]` to a tabular model
#[derive(Clone)]
pub struct TabularAdapter {
    runtime: Arc<dyn ModelRuntime>,
    width: usize,
}

impl TabularAdapter {
    /// `feature_count` is the model's declared input width; never narrower than
    /// the engineered feature set.
    pub fn new(runtime: Arc<dyn ModelRuntime>, feature_count: usize) -> Self {
        Self {
            runtime,
            width: feature_count.max(FEATURE_NAMES.len()),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Single-row `(1, width)` matrix
    pub fn prepare(&self, series: &PriceSeries) -> Result<ModelInput, InferenceError> {
        if series.is_empty() {
            return Err(InferenceError::EmptySeries);
        }

        let features = TabularFeatures::from_prices(series.prices());
        let row = feature_registry::features_to_vector(&features, self.width);
        Array2::from_shape_vec((1, self.width), row)
            .map(|m| m.into_dyn())
            .map_err(|e| InferenceError::Runtime(e.to_string()))
    }

    pub fn predict(&self, series: &PriceSeries) -> Result<f64, InferenceError> {
        let input = self.prepare(series)?;
        let output = self.runtime.predict(&input)?;
        output.first().copied().ok_or(InferenceError::EmptyOutput)
    }

    /// Importance per named input column, normalized to sum 1.
    /// Empty when the runtime does not describe one.
    pub fn feature_importance(&self) -> BTreeMap<String, f64> {
        let Some(scores) = self.runtime.feature_importance() else {
            return BTreeMap::new();
        };

        let total: f64 = scores.iter().filter(|s| s.is_finite()).sum();
        if total <= 0.0 {
            return BTreeMap::new();
        }

        scores
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_finite() && **s > 0.0)
            .map(|(i, s)| (feature_registry::feature_name(i), s / total))
            .collect()
    }
}
