use crate::domain::errors::InferenceError;
use crate::domain::market::series::PriceSeries;
use crate::domain::ports::{ModelInput, ModelRuntime};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input geometry of a sequence model: `(1, timesteps, features)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowShape {
    pub timesteps: usize,
    pub features: usize,
}

impl Default for WindowShape {
    fn default() -> Self {
        Self {
            timesteps: 60,
            features: 1,
        }
    }
}

/// Min-max scaling fitted on one window.
///
/// A constant window has a zero range; the denominator falls back to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    min: f64,
    denom: f64,
}

impl MinMaxScaler {
    pub fn fit(window: &[f64]) -> Self {
        let min = window.iter().copied().fold(f64::INFINITY, f64::min);
        let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return Self { min: 0.0, denom: 1.0 };
        }

        let range = max - min;
        Self {
            min,
            denom: if range != 0.0 { range } else { 1.0 },
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn denom(&self) -> f64 {
        self.denom
    }

    pub fn scale(&self, value: f64) -> f64 {
        (value - self.min) / self.denom
    }

    pub fn unscale(&self, scaled: f64) -> f64 {
        scaled * self.denom + self.min
    }
}

/// Last `timesteps` prices, left-padded with the earliest price when short.
pub fn build_window(prices: &[f64], timesteps: usize) -> Vec<f64> {
    let Some(&earliest) = prices.first() else {
        return Vec::new();
    };

    let start = prices.len().saturating_sub(timesteps);
    let tail = &prices[start..];

    let mut window = Vec::with_capacity(timesteps);
    window.resize(timesteps - tail.len(), earliest);
    window.extend_from_slice(tail);
    window
}

/// Feeds a normalized recent-price window to a sequence model
#[derive(Clone)]
pub struct WindowedSequenceAdapter {
    runtime: Arc<dyn ModelRuntime>,
    shape: WindowShape,
}

impl WindowedSequenceAdapter {
    pub fn new(runtime: Arc<dyn ModelRuntime>, shape: WindowShape) -> Self {
        Self {
            runtime,
            shape: WindowShape {
                timesteps: shape.timesteps.max(1),
                features: shape.features.max(1),
            },
        }
    }

    pub fn shape(&self) -> WindowShape {
        self.shape
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Scaled `(1, T, F)` input and the scaler needed to read the output back.
    ///
    /// With `F > 1` the single price channel is repeated across every feature.
    pub fn prepare(&self, series: &PriceSeries) -> Result<(ModelInput, MinMaxScaler), InferenceError> {
        let WindowShape {
            timesteps,
            features,
        } = self.shape;

        let window = build_window(series.prices(), timesteps);
        if window.is_empty() {
            return Err(InferenceError::EmptySeries);
        }

        let scaler = MinMaxScaler::fit(&window);
        let input = Array3::from_shape_fn((1, timesteps, features), |(_, t, _)| {
            scaler.scale(window[t]) as f32
        });

        Ok((input.into_dyn(), scaler))
    }

    pub fn predict(&self, series: &PriceSeries) -> Result<f64, InferenceError> {
        let (input, scaler) = self.prepare(series)?;
        let output = self.runtime.predict(&input)?;
        let scaled = output.first().copied().ok_or(InferenceError::EmptyOutput)?;
        Ok(scaler.unscale(scaled))
    }
}
