use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The three contributors to a consensus, in their fixed roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    /// Recurrent sequence-regression model
    Lstm,
    /// Gradient-boosted tree model on tabular features
    Xgboost,
    /// Attention-based sequence model
    Transformer,
}

impl ModelRole {
    pub const ALL: [ModelRole; 3] = [ModelRole::Lstm, ModelRole::Xgboost, ModelRole::Transformer];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::Lstm => "lstm",
            ModelRole::Xgboost => "xgboost",
            ModelRole::Transformer => "transformer",
        }
    }

    /// Fixed per-model confidence reported alongside each prediction
    pub fn base_confidence(&self) -> f64 {
        match self {
            ModelRole::Lstm => 0.82,
            ModelRole::Xgboost => 0.78,
            ModelRole::Transformer => 0.85,
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a predicted move relative to the current price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

/// One model's contribution to a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPrediction {
    pub price: f64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention_weights: Option<Vec<f64>>,
}

impl ModelPrediction {
    pub fn new(price: f64, confidence: f64) -> Self {
        Self {
            price,
            confidence: confidence.clamp(0.0, 1.0),
            direction: None,
            feature_importance: None,
            attention_weights: None,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_feature_importance(mut self, importance: BTreeMap<String, f64>) -> Self {
        self.feature_importance = Some(importance);
        self
    }

    pub fn with_attention_weights(mut self, weights: Vec<f64>) -> Self {
        self.attention_weights = Some(weights);
        self
    }
}

/// Per-role predictions of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePredictions {
    pub lstm: ModelPrediction,
    pub xgboost: ModelPrediction,
    pub transformer: ModelPrediction,
}

impl RolePredictions {
    pub fn get(&self, role: ModelRole) -> &ModelPrediction {
        match role {
            ModelRole::Lstm => &self.lstm,
            ModelRole::Xgboost => &self.xgboost,
            ModelRole::Transformer => &self.transformer,
        }
    }
}

/// Aggregate of all three predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    pub price: f64,
    pub confidence: f64,
    pub change_percent: f64,
    pub method: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        let names: Vec<_> = ModelRole::ALL.iter().map(|r| r.to_string()).collect();
        assert_eq!(names, vec!["lstm", "xgboost", "transformer"]);
        assert_eq!(serde_json::to_string(&ModelRole::Xgboost).unwrap(), "\"xgboost\"");
    }

    #[test]
    fn test_prediction_serializes_camel_case_and_skips_absent_fields() {
        let pred = ModelPrediction::new(101.0, 0.78).with_feature_importance(BTreeMap::new());
        let json = serde_json::to_value(&pred).unwrap();

        assert_eq!(json["price"], 101.0);
        assert!(json.get("featureImportance").is_some());
        assert!(json.get("direction").is_none());
        assert!(json.get("attentionWeights").is_none());
    }

    #[test]
    fn test_confidence_is_bounded() {
        assert_eq!(ModelPrediction::new(1.0, 1.7).confidence, 1.0);
        assert_eq!(ModelPrediction::new(1.0, -0.2).confidence, 0.0);
    }
}
