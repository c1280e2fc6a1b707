//! Consensus of the three model prices.
//!
//! Fixed weights, dispersion-based confidence clamped to a floor and ceiling,
//! and a deadband around the current price for direction labels.

use crate::domain::ml::prediction::{ConsensusResult, Direction};
use statrs::statistics::Statistics;

/// Label reported in `ConsensusResult::method`
pub const METHOD_WEIGHTED_AVERAGE: &str = "weighted_average";

pub const LSTM_WEIGHT: f64 = 0.35;
pub const XGBOOST_WEIGHT: f64 = 0.30;
pub const TRANSFORMER_WEIGHT: f64 = 0.35;

pub const MIN_CONFIDENCE: f64 = 0.30;
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Bounds of the flat band around the current price (±0.2%)
pub const UP_THRESHOLD: f64 = 1.002;
pub const DOWN_THRESHOLD: f64 = 0.998;

/// Scalar prices of one request, one per role
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolePrices {
    pub lstm: f64,
    pub xgboost: f64,
    pub transformer: f64,
}

impl RolePrices {
    fn as_array(&self) -> [f64; 3] {
        [self.lstm, self.xgboost, self.transformer]
    }
}

/// Combine the three prices against the current price anchor.
pub fn combine(prices: &RolePrices, current_price: f64) -> ConsensusResult {
    let price = weighted_price(prices);
    ConsensusResult {
        price,
        confidence: dispersion_confidence(&prices.as_array()),
        change_percent: change_percent(price, current_price),
        method: METHOD_WEIGHTED_AVERAGE.to_string(),
    }
}

pub fn weighted_price(prices: &RolePrices) -> f64 {
    LSTM_WEIGHT * prices.lstm + XGBOOST_WEIGHT * prices.xgboost + TRANSFORMER_WEIGHT * prices.transformer
}

/// `1 - std/mean` (population std), 0 for a zero mean, then clamped.
pub fn dispersion_confidence(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return MIN_CONFIDENCE;
    }

    let mean = prices.mean();
    let std_dev = prices.population_std_dev();
    let raw = if mean != 0.0 { 1.0 - std_dev / mean } else { 0.0 };

    // clamp passes NaN through
    if raw.is_nan() {
        return MIN_CONFIDENCE;
    }
    raw.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// Percent move from `current_price`; 0.0 when there is no baseline.
pub fn change_percent(predicted: f64, current_price: f64) -> f64 {
    if current_price == 0.0 {
        return 0.0;
    }
    (predicted - current_price) / current_price * 100.0
}

pub fn direction(current_price: f64, predicted: f64) -> Direction {
    if predicted > current_price * UP_THRESHOLD {
        Direction::Up
    } else if predicted < current_price * DOWN_THRESHOLD {
        Direction::Down
    } else {
        Direction::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_price() {
        let prices = RolePrices {
            lstm: 165.0,
            xgboost: 163.0,
            transformer: 166.0,
        };
        assert!((weighted_price(&prices) - 164.75).abs() < 1e-9);
    }

    #[test]
    fn test_identical_predictions_clamp_to_ceiling() {
        assert_eq!(dispersion_confidence(&[120.0, 120.0, 120.0]), MAX_CONFIDENCE);
    }

    #[test]
    fn test_divergent_predictions_clamp_to_floor() {
        assert_eq!(dispersion_confidence(&[1.0, 500.0, 90_000.0]), MIN_CONFIDENCE);
        assert_eq!(dispersion_confidence(&[-50.0, 10.0, 45.0]), MIN_CONFIDENCE);
    }

    #[test]
    fn test_confidence_between_bounds_is_unclamped() {
        // mean 100, population std sqrt(200/3) ≈ 8.165
        let conf = dispersion_confidence(&[90.0, 100.0, 110.0]);
        let expected = 1.0 - (200.0_f64 / 3.0).sqrt() / 100.0;
        assert!((conf - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_mean_uses_floor() {
        assert_eq!(dispersion_confidence(&[-1.0, 0.0, 1.0]), MIN_CONFIDENCE);
    }

    #[test]
    fn test_change_percent_zero_baseline() {
        assert_eq!(change_percent(164.75, 0.0), 0.0);
        assert_eq!(change_percent(-3.0, 0.0), 0.0);
        assert!((change_percent(110.0, 100.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_direction_deadband_boundaries() {
        assert_eq!(direction(100.0, 100.2), Direction::Flat);
        assert_eq!(direction(100.0, 100.2001), Direction::Up);
        assert_eq!(direction(100.0, 99.8), Direction::Flat);
        assert_eq!(direction(100.0, 99.7999), Direction::Down);
        assert_eq!(direction(100.0, 100.0), Direction::Flat);
    }

    #[test]
    fn test_combine() {
        let result = combine(
            &RolePrices {
                lstm: 165.0,
                xgboost: 163.0,
                transformer: 166.0,
            },
            164.0,
        );
        assert!((result.price - 164.75).abs() < 1e-9);
        assert!((result.change_percent - 0.75 / 164.0 * 100.0).abs() < 1e-9);
        assert_eq!(result.method, METHOD_WEIGHTED_AVERAGE);
        assert!(result.confidence >= MIN_CONFIDENCE && result.confidence <= MAX_CONFIDENCE);
    }
}
