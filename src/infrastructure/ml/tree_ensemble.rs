//! In-process evaluation of XGBoost JSON tree ensembles.
//!
//! Only the `gbtree` booster with single-target objectives is supported:
//! every tree is walked from its root, leaf values are summed on top of the
//! base margin and the objective's link function is applied.

use crate::domain::errors::{InferenceError, ModelLoadError};
use crate::domain::ports::{ModelInput, ModelRuntime};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: Objective,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    name: String,
    model: Option<GbTreeModel>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModel {
    trees: Vec<RawTree>,
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    /// 0 numerical, 1 categorical
    #[serde(default)]
    split_type: Vec<u8>,
    #[serde(default)]
    categories_nodes: Vec<i32>,
}

/// Older exports write 0/1, newer ones booleans
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    #[serde(default)]
    num_feature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Objective {
    name: String,
}

/// Output transform implied by the training objective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Identity,
    Logistic,
    Log,
}

impl Link {
    fn for_objective(name: &str) -> Option<Self> {
        match name {
            "reg:squarederror" | "reg:linear" | "reg:squaredlogerror" | "reg:pseudohubererror"
            | "reg:absoluteerror" | "reg:quantileerror" => Some(Link::Identity),
            "reg:logistic" | "binary:logistic" | "binary:logitraw" => Some(Link::Logistic),
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Some(Link::Log),
            _ => None,
        }
    }

    /// Base score is stored in output space; trees add in margin space.
    fn to_margin(self, base_score: f64) -> f64 {
        match self {
            Link::Identity => base_score,
            Link::Logistic => (base_score / (1.0 - base_score)).ln(),
            Link::Log => base_score.ln(),
        }
    }

    fn apply(self, margin: f64) -> f64 {
        match self {
            Link::Identity => margin,
            Link::Logistic => 1.0 / (1.0 + (-margin).exp()),
            Link::Log => margin.exp(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    left: i32,
    right: i32,
    feature: usize,
    /// Split threshold for inner nodes, leaf value for leaves
    value: f32,
    default_left: bool,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.left < 0
    }
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_raw(raw: RawTree, index: usize, path: &Path) -> Result<Self, ModelLoadError> {
        let n = raw.left_children.len();
        let corrupt = |reason: String| ModelLoadError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("tree {}: {}", index, reason),
        };

        if n == 0 {
            return Err(corrupt("no nodes".to_string()));
        }
        if raw.right_children.len() != n
            || raw.split_indices.len() != n
            || raw.split_conditions.len() != n
            || raw.default_left.len() != n
        {
            return Err(corrupt("node arrays differ in length".to_string()));
        }
        if raw.split_type.iter().any(|&t| t != 0) || !raw.categories_nodes.is_empty() {
            return Err(corrupt("categorical splits unsupported".to_string()));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (raw.left_children[i], raw.right_children[i]);
            if left >= 0 {
                // children always follow their parent, which rules out cycles
                let in_range = |c: i32| (c as usize) > i && (c as usize) < n;
                if right < 0 || !in_range(left) || !in_range(right) {
                    return Err(corrupt(format!("node {} has invalid children", i)));
                }
            }
            nodes.push(Node {
                left,
                right,
                feature: raw.split_indices[i] as usize,
                value: raw.split_conditions[i],
                default_left: raw.default_left[i].is_set(),
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, row: &[f32]) -> f32 {
        let mut node = &self.nodes[0];
        while !node.is_leaf() {
            let go_left = match row.get(node.feature) {
                Some(x) if !x.is_nan() => *x < node.value,
                _ => node.default_left,
            };
            let next = if go_left { node.left } else { node.right };
            node = &self.nodes[next as usize];
        }
        node.value
    }

    fn split_features(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().filter(|n| !n.is_leaf()).map(|n| n.feature)
    }
}

/// Gradient-boosted tree ensemble loaded from an XGBoost JSON model
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    trees: Vec<Tree>,
    base_margin: f64,
    link: Link,
    num_feature: usize,
    model_path: PathBuf,
}

impl TreeEnsemble {
    pub fn load(model_path: &Path) -> Result<Self, ModelLoadError> {
        let bytes = std::fs::read(model_path).map_err(|source| ModelLoadError::Io {
            path: model_path.to_path_buf(),
            source,
        })?;
        let ensemble = Self::from_slice(&bytes, model_path)?;

        info!(
            "Successfully loaded tree ensemble from {:?} ({} trees, {} features)",
            model_path,
            ensemble.trees.len(),
            ensemble.num_feature
        );
        Ok(ensemble)
    }

    pub fn from_slice(bytes: &[u8], model_path: &Path) -> Result<Self, ModelLoadError> {
        let corrupt = |reason: String| ModelLoadError::Corrupt {
            path: model_path.to_path_buf(),
            reason,
        };

        let file: ModelFile = serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
        let learner = file.learner;

        if learner.gradient_booster.name != "gbtree" {
            return Err(corrupt(format!(
                "unsupported booster '{}', expected gbtree",
                learner.gradient_booster.name
            )));
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| corrupt("gbtree model section missing".to_string()))?;

        let link = Link::for_objective(&learner.objective.name)
            .ok_or_else(|| corrupt(format!("unsupported objective '{}'", learner.objective.name)))?;

        let base_score = parse_base_score(&learner.learner_model_param.base_score)
            .ok_or_else(|| corrupt("base_score is not a number".to_string()))?;

        let num_feature = learner
            .learner_model_param
            .num_feature
            .as_deref()
            .map(|s| s.trim().parse::<usize>())
            .transpose()
            .map_err(|e| corrupt(format!("num_feature: {}", e)))?
            .unwrap_or(0);

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Tree::from_raw(raw, i, model_path))
            .collect::<Result<Vec<_>, _>>()?;

        let num_feature = trees
            .iter()
            .flat_map(|t| t.split_features())
            .map(|f| f + 1)
            .fold(num_feature, usize::max);

        Ok(Self {
            trees,
            base_margin: link.to_margin(base_score),
            link,
            num_feature,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn link(&self) -> Link {
        self.link
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn evaluate(&self, row: &[f32]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.leaf_value(row) as f64).sum();
        self.link.apply(self.base_margin + sum)
    }
}

/// `"1.5E2"` as well as the bracketed vector form `"[1.5E2]"`
fn parse_base_score(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .next()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

impl ModelRuntime for TreeEnsemble {
    fn predict(&self, input: &ModelInput) -> Result<Vec<f64>, InferenceError> {
        let width = input.shape().last().copied().unwrap_or(0);
        if width < self.num_feature {
            return Err(InferenceError::FeatureMismatch {
                expected: self.num_feature,
                actual: width,
            });
        }
        if width == 0 {
            return Err(InferenceError::EmptyOutput);
        }

        let values: Vec<f32> = input.iter().copied().collect();
        Ok(values.chunks(width).map(|row| self.evaluate(row)).collect())
    }

    fn name(&self) -> &str {
        "XGBoost tree ensemble"
    }

    fn declared_features(&self) -> Option<usize> {
        (self.num_feature > 0).then_some(self.num_feature)
    }

    /// Split count per feature
    fn feature_importance(&self) -> Option<Vec<f64>> {
        let mut counts = vec![0.0; self.num_feature];
        for feature in self.trees.iter().flat_map(|t| t.split_features()) {
            counts[feature] += 1.0;
        }
        Some(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use serde_json::json;

    fn model_json(base_score: &str, objective: &str, default_left: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "learner": {
                "attributes": {},
                "feature_names": [],
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "gbtree_model_param": {"num_parallel_tree": "1", "num_trees": "2"},
                        "tree_info": [0, 0],
                        "trees": [
                            {
                                "id": 0,
                                "left_children": [1, -1, -1],
                                "right_children": [2, -1, -1],
                                "split_indices": [0, 0, 0],
                                "split_conditions": [100.0, -5.0, 5.0],
                                "default_left": default_left,
                                "base_weights": [0.0, -5.0, 5.0]
                            },
                            {
                                "id": 1,
                                "left_children": [1, -1, -1],
                                "right_children": [2, -1, -1],
                                "split_indices": [2, 0, 0],
                                "split_conditions": [0.05, 1.0, 2.0],
                                "default_left": [0, 0, 0],
                                "base_weights": [0.0, 1.0, 2.0]
                            }
                        ]
                    }
                },
                "learner_model_param": {
                    "base_score": base_score,
                    "num_class": "0",
                    "num_feature": "3"
                },
                "objective": {"name": objective}
            },
            "version": [2, 0, 3]
        }))
        .unwrap()
    }

    fn ensemble(bytes: &[u8]) -> TreeEnsemble {
        TreeEnsemble::from_slice(bytes, Path::new("xgboost.json")).unwrap()
    }

    fn row(values: [f32; 3]) -> ModelInput {
        Array2::from_shape_vec((1, 3), values.to_vec()).unwrap().into_dyn()
    }

    #[test]
    fn test_sums_leaves_over_base_score() {
        let model = ensemble(&model_json("1.5E2", "reg:squarederror", json!([1, 0, 0])));
        assert_eq!(model.num_trees(), 2);
        assert_eq!(model.declared_features(), Some(3));

        assert_eq!(model.predict(&row([120.0, 0.0, 0.01])).unwrap(), vec![156.0]);
        assert_eq!(model.predict(&row([50.0, 0.0, 0.10])).unwrap(), vec![147.0]);
    }

    #[test]
    fn test_bracketed_base_score_and_bool_flags() {
        let model = ensemble(&model_json("[1.5E2]", "reg:squarederror", json!([true, false, false])));
        assert_eq!(model.predict(&row([120.0, 0.0, 0.01])).unwrap(), vec![156.0]);
    }

    #[test]
    fn test_missing_value_follows_default_branch() {
        let model = ensemble(&model_json("0", "reg:squarederror", json!([1, 0, 0])));
        // NaN goes left in tree 0 (-5), then 0.01 < 0.05 goes left in tree 1 (+1)
        assert_eq!(model.predict(&row([f32::NAN, 0.0, 0.01])).unwrap(), vec![-4.0]);
    }

    #[test]
    fn test_logistic_objective_applies_sigmoid() {
        let model = ensemble(&model_json("0.5", "binary:logistic", json!([1, 0, 0])));
        assert_eq!(model.link(), Link::Logistic);
        let p = model.predict(&row([120.0, 0.0, 0.01])).unwrap()[0];
        assert!((p - 1.0 / (1.0 + (-6.0_f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_narrow_input_is_rejected() {
        let model = ensemble(&model_json("0", "reg:squarederror", json!([1, 0, 0])));
        let input = Array2::from_shape_vec((1, 2), vec![1.0, 2.0]).unwrap().into_dyn();
        assert!(matches!(
            model.predict(&input),
            Err(InferenceError::FeatureMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_split_count_importance() {
        let model = ensemble(&model_json("0", "reg:squarederror", json!([1, 0, 0])));
        assert_eq!(model.feature_importance(), Some(vec![1.0, 0.0, 1.0]));
    }

    #[test]
    fn test_unsupported_booster_is_corrupt() {
        let bytes = serde_json::to_vec(&json!({
            "learner": {
                "gradient_booster": {"name": "gblinear", "model": null},
                "learner_model_param": {"base_score": "0"},
                "objective": {"name": "reg:squarederror"}
            }
        }))
        .unwrap();

        let err = TreeEnsemble::from_slice(&bytes, Path::new("linear.json")).unwrap_err();
        assert!(err.to_string().contains("gblinear"));
    }

    #[test]
    fn test_backward_child_index_is_corrupt() {
        let mut value: serde_json::Value =
            serde_json::from_slice(&model_json("0", "reg:squarederror", json!([1, 0, 0]))).unwrap();
        value["learner"]["gradient_booster"]["model"]["trees"][0]["left_children"] = json!([0, -1, -1]);

        let err = TreeEnsemble::from_slice(&serde_json::to_vec(&value).unwrap(), Path::new("cyclic.json"))
            .unwrap_err();
        assert!(matches!(err, ModelLoadError::Corrupt { .. }));
        assert!(err.to_string().contains("invalid children"));
    }

    #[test]
    fn test_categorical_split_is_rejected() {
        let mut value: serde_json::Value =
            serde_json::from_slice(&model_json("0", "reg:squarederror", json!([1, 0, 0]))).unwrap();
        let tree = &mut value["learner"]["gradient_booster"]["model"]["trees"][1];
        tree["split_type"] = json!([1, 0, 0]);
        tree["categories_nodes"] = json!([0]);
        tree["categories"] = json!([2, 5]);

        let err = TreeEnsemble::from_slice(&serde_json::to_vec(&value).unwrap(), Path::new("cat.json"))
            .unwrap_err();
        assert!(matches!(err, ModelLoadError::Corrupt { .. }));
        assert!(err.to_string().contains("categorical splits unsupported"));
    }

    #[test]
    fn test_numerical_split_types_load() {
        let mut value: serde_json::Value =
            serde_json::from_slice(&model_json("0", "reg:squarederror", json!([1, 0, 0]))).unwrap();
        for i in 0..2 {
            let tree = &mut value["learner"]["gradient_booster"]["model"]["trees"][i];
            tree["split_type"] = json!([0, 0, 0]);
            tree["categories_nodes"] = json!([]);
        }

        let model = ensemble(&serde_json::to_vec(&value).unwrap());
        assert_eq!(model.num_trees(), 2);
    }

    #[test]
    fn test_not_json_is_corrupt() {
        let err = TreeEnsemble::from_slice(b"\x00\x01binary", Path::new("model.json")).unwrap_err();
        assert!(matches!(err, ModelLoadError::Corrupt { .. }));
    }

    #[test]
    fn test_parse_base_score_forms() {
        assert_eq!(parse_base_score("1.5E2"), Some(150.0));
        assert_eq!(parse_base_score("[5E-1]"), Some(0.5));
        assert_eq!(parse_base_score("abc"), None);
    }
}
