//! Closing-price extraction from loosely-typed historical bars.
//!
//! Upstream data providers disagree on field names and types, so extraction is
//! best-effort: a bar either yields one finite closing price or is skipped.
//! Skipping is the intended policy, not an error.

use serde_json::{Map, Value};

/// One historical record as received on the wire. Only the close is read.
pub type HistoricalBar = Map<String, Value>;

/// Primary and fallback field names for the closing price
pub const CLOSE_FIELDS: [&str; 2] = ["close", "c"];

/// Chronological closing prices for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    prices: Vec<f64>,
}

impl PriceSeries {
    pub fn new(prices: Vec<f64>) -> Self {
        Self { prices }
    }

    /// Extract closes from bars in the order given. Order is trusted, not checked.
    pub fn from_bars(bars: Option<&[HistoricalBar]>) -> Self {
        let prices = bars
            .unwrap_or_default()
            .iter()
            .filter_map(close_price)
            .collect();
        Self { prices }
    }

    /// Last price, or 0.0 for an empty series
    pub fn current_price(&self) -> f64 {
        self.prices.last().copied().unwrap_or(0.0)
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Series plus current-price anchor for an optional bar list.
pub fn extract_series(bars: Option<&[HistoricalBar]>) -> (PriceSeries, f64) {
    let series = PriceSeries::from_bars(bars);
    let current = series.current_price();
    (series, current)
}

/// Closing price of one bar.
///
/// `c` is consulted only when `close` is absent or null. A present but
/// unparseable `close` skips the bar.
pub fn close_price(bar: &HistoricalBar) -> Option<f64> {
    let raw = CLOSE_FIELDS
        .iter()
        .find_map(|field| bar.get(*field).filter(|v| !v.is_null()))?;

    let price = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    price.is_finite().then_some(price)
}
