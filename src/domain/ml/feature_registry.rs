use statrs::statistics::Statistics;

/// Ordered list of tabular feature names.
/// This order MUST match the column order the tree model was fitted on.
pub const FEATURE_NAMES: &[&str] = &["last_price", "mean_return", "volatility"];

/// Floor for the previous price when computing simple returns
pub const RETURN_EPSILON: f64 = 1e-9;

/// Engineered inputs of the tabular model
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TabularFeatures {
    pub last_price: f64,
    pub mean_return: f64,
    pub volatility: f64,
}

impl TabularFeatures {
    /// Features of a price series; an empty series yields all zeros.
    pub fn from_prices(prices: &[f64]) -> Self {
        let returns = simple_returns(prices);
        let (mean_return, volatility) = if returns.is_empty() {
            (0.0, 0.0)
        } else {
            (returns.iter().mean(), returns.iter().population_std_dev())
        };

        Self {
            last_price: prices.last().copied().unwrap_or(0.0),
            mean_return,
            volatility,
        }
    }
}

/// `(p_i - p_{i-1}) / max(p_{i-1}, ε)` for each consecutive pair.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0].max(RETURN_EPSILON))
        .collect()
}

/// Converts features into an f32 row of `width` columns for inference.
/// Columns past the known features are zero-filled.
pub fn features_to_vector(fs: &TabularFeatures, width: usize) -> Vec<f32> {
    let mut row = vec![0.0_f32; width.max(FEATURE_NAMES.len())];
    row[0] = fs.last_price as f32;
    row[1] = fs.mean_return as f32;
    row[2] = fs.volatility as f32;
    row
}

/// Name of input column `index`, falling back to `f{index}` for padding columns.
pub fn feature_name(index: usize) -> String {
    FEATURE_NAMES
        .get(index)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("f{}", index))
}
