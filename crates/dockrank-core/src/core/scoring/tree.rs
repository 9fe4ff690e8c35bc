use super::{ModelError, Prediction, Predictor};
use crate::core::features::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A node of an array-encoded binary tree.
///
/// A split sends a sample to `left` when `x[feature] <= threshold`, otherwise to
/// `right`. Children always sit after their parent in the node array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn evaluate(&self, values: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if values[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn validate(&self, tree_index: usize, num_features: usize) -> Result<(), ModelError> {
        let invalid = |msg: String| ModelError::InvalidParameters(format!("tree {}: {}", tree_index, msg));
        if self.nodes.is_empty() {
            return Err(invalid("tree has no nodes".to_string()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(invalid(format!("leaf {} has a non-finite value", idx)));
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= num_features {
                        return Err(invalid(format!(
                            "node {} splits on feature {} of {}",
                            idx, feature, num_features
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(invalid(format!("node {} has a NaN threshold", idx)));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(invalid(format!(
                                "node {} has child {} outside {}..{}",
                                idx,
                                child,
                                idx + 1,
                                self.nodes.len()
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Average of tree outputs (random forest).
    #[default]
    Mean,
    /// `base_score` plus the sum of tree outputs (gradient boosting).
    Sum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsembleParams {
    pub trees: Vec<Tree>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_score: f64,
}

#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    schema: Arc<FeatureSchema>,
    params: TreeEnsembleParams,
}

impl TreeEnsemble {
    pub fn new(schema: Arc<FeatureSchema>, params: TreeEnsembleParams) -> Result<Self, ModelError> {
        if params.trees.is_empty() {
            return Err(ModelError::InvalidParameters(
                "tree ensemble has no trees".to_string(),
            ));
        }
        if !params.base_score.is_finite() {
            return Err(ModelError::InvalidParameters(
                "base score must be finite".to_string(),
            ));
        }
        let num_features = schema.expected_length();
        for (i, tree) in params.trees.iter().enumerate() {
            tree.validate(i, num_features)?;
        }
        Ok(Self { schema, params })
    }

    pub fn num_trees(&self) -> usize {
        self.params.trees.len()
    }
}

impl Predictor for TreeEnsemble {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict_values(&self, values: &[f64]) -> Prediction {
        let trees = &self.params.trees;
        match self.params.aggregation {
            Aggregation::Sum => Prediction::new(
                self.params.base_score + trees.iter().map(|t| t.evaluate(values)).sum::<f64>(),
            ),
            Aggregation::Mean => {
                let n = trees.len() as f64;
                let (sum, sum_sq) = trees
                    .iter()
                    .map(|t| t.evaluate(values))
                    .fold((0.0, 0.0), |(s, sq), v| (s + v, sq + v * v));
                let mean = sum / n;
                if trees.len() < 2 {
                    return Prediction::new(mean);
                }
                let variance = (sum_sq / n - mean * mean).max(0.0);
                Prediction::with_confidence(mean, 1.0 / (1.0 + variance.sqrt()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::{FeatureVector, Normalization};

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(FeatureSchema::new(["C", "O"], vec![0.0, 4.0], 4.0, Normalization::None).unwrap())
    }

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> Tree {
        Tree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: low },
                TreeNode::Leaf { value: high },
            ],
        }
    }

    #[test]
    fn mean_ensemble_averages_and_reports_agreement() {
        let model = TreeEnsemble::new(
            schema(),
            TreeEnsembleParams {
                trees: vec![stump(1, 0.5, -1.0, 3.0), stump(1, 0.5, -1.0, 5.0)],
                aggregation: Aggregation::Mean,
                base_score: 0.0,
            },
        )
        .unwrap();

        let low = FeatureVector::new(schema(), vec![0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(model.predict(&low).unwrap(), Prediction::with_confidence(-1.0, 1.0));

        let high = FeatureVector::new(schema(), vec![0.0, 1.0, 0.0, 0.0]).unwrap();
        let p = model.predict(&high).unwrap();
        assert_eq!(p.score, 4.0);
        assert!((p.confidence.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn sum_ensemble_adds_base_score() {
        let model = TreeEnsemble::new(
            schema(),
            TreeEnsembleParams {
                trees: vec![stump(0, 1.0, 0.1, 0.2), stump(3, 2.0, 0.3, 0.4)],
                aggregation: Aggregation::Sum,
                base_score: 1.0,
            },
        )
        .unwrap();
        let x = FeatureVector::new(schema(), vec![1.0, 0.0, 0.0, 5.0]).unwrap();
        let p = model.predict(&x).unwrap();
        assert!((p.score - 1.5).abs() < 1e-12);
        assert_eq!(p.confidence, None);
    }

    #[test]
    fn invalid_structures_are_rejected() {
        let bad_feature = stump(9, 0.0, 0.0, 0.0);
        let cyclic = Tree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 1,
                },
                TreeNode::Leaf { value: 1.0 },
            ],
        };
        let dangling = Tree {
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 1,
                right: 2,
            }],
        };
        for tree in [bad_feature, cyclic, dangling, Tree { nodes: vec![] }] {
            let result = TreeEnsemble::new(
                schema(),
                TreeEnsembleParams {
                    trees: vec![tree],
                    aggregation: Aggregation::Mean,
                    base_score: 0.0,
                },
            );
            assert!(matches!(result, Err(ModelError::InvalidParameters(_))));
        }
    }

    #[test]
    fn nodes_deserialize_untagged() {
        let json = r#"{"nodes":[{"feature":0,"threshold":1.5,"left":1,"right":2},{"value":-2.0},{"value":3}]}"#;
        let tree: Tree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.nodes[2], TreeNode::Leaf { value: 3.0 });
        assert_eq!(tree.evaluate(&[2.0]), 3.0);
    }
}
