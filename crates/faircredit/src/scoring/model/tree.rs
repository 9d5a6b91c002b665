use serde::{Deserialize, Serialize};

use super::{Classifier, ModelLoadError};
use crate::scoring::features::{Feature, FeatureVector, FEATURE_COUNT};
use crate::scoring::scorer::ScoringError;

const COVER_TOLERANCE: f64 = 1e-6;

/// One node of a fitted tree. `cover` is the training weight that reached the
/// node and doubles as the background distribution for attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

impl TreeNode {
    pub fn cover(&self) -> f64 {
        match self {
            TreeNode::Split { cover, .. } | TreeNode::Leaf { cover, .. } => *cover,
        }
    }
}

/// Flat node list; node 0 is the root and children always sit after their
/// parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Child taken by `features` at a split. Values below the threshold go
    /// left.
    pub fn branch(features: &FeatureVector, feature: Feature, threshold: f64) -> Branch {
        if features.get(feature) < threshold {
            Branch::Left
        } else {
            Branch::Right
        }
    }

    pub fn leaf_value(&self, features: &FeatureVector) -> Result<f64, ScoringError> {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value, .. }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                }) => {
                    let feature = Feature::from_index(*feature).ok_or_else(|| {
                        ScoringError::Model(format!("split on unknown feature {feature}"))
                    })?;
                    let next = match Self::branch(features, feature, *threshold) {
                        Branch::Left => *left,
                        Branch::Right => *right,
                    };
                    if next <= index {
                        return Err(ScoringError::Model(format!(
                            "node {index} points back to node {next}"
                        )));
                    }
                    index = next;
                }
                None => {
                    return Err(ScoringError::Model(format!("missing tree node {index}")));
                }
            }
        }
    }

    /// Cover-weighted mean leaf value, i.e. the tree's output with no
    /// feature known.
    pub fn expected_value(&self) -> f64 {
        self.subtree_expectation(0)
    }

    fn subtree_expectation(&self, index: usize) -> f64 {
        match &self.nodes[index] {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split { left, right, .. } => {
                let left_cover = self.nodes[*left].cover();
                let right_cover = self.nodes[*right].cover();
                (left_cover * self.subtree_expectation(*left)
                    + right_cover * self.subtree_expectation(*right))
                    / (left_cover + right_cover)
            }
        }
    }

    fn validate(&self, tree: usize) -> Result<(), ModelLoadError> {
        let invalid = |node: usize, reason: String| ModelLoadError::InvalidTree { tree, node, reason };

        if self.nodes.is_empty() {
            return Err(invalid(0, "tree has no nodes".to_string()));
        }

        let mut parents = vec![0usize; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            let cover = node.cover();
            if !cover.is_finite() || cover <= 0.0 {
                return Err(invalid(index, format!("cover must be positive (got {cover})")));
            }

            match node {
                TreeNode::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(invalid(index, "leaf value is not finite".to_string()));
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(invalid(index, format!("split on unknown feature {feature}")));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(index, "threshold is not finite".to_string()));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(invalid(index, format!("child {child} is out of order")));
                        }
                        parents[child] += 1;
                    }
                    if left == right {
                        return Err(invalid(index, "both branches lead to the same node".to_string()));
                    }

                    let children = self.nodes[*left].cover() + self.nodes[*right].cover();
                    if (cover - children).abs() > COVER_TOLERANCE * cover.max(1.0) {
                        return Err(invalid(
                            index,
                            format!("cover {cover} does not match children total {children}"),
                        ));
                    }
                }
            }
        }

        if let Some(orphan) = (1..self.nodes.len()).find(|index| parents[*index] != 1) {
            return Err(invalid(orphan, "node must have exactly one parent".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Left,
    Right,
}

/// Gradient-boosted trees with a logistic link. Outputs are summed in margin
/// (log-odds) space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub base_score: f64,
    pub trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    pub fn margin(&self, features: &FeatureVector) -> Result<f64, ScoringError> {
        self.trees
            .iter()
            .try_fold(self.base_score, |total, tree| {
                Ok(total + tree.leaf_value(features)?)
            })
    }

    pub fn probability(&self, features: &FeatureVector) -> Result<f64, ScoringError> {
        self.margin(features).map(sigmoid)
    }

    pub(crate) fn validate(&self) -> Result<(), ModelLoadError> {
        if !self.base_score.is_finite() {
            return Err(ModelLoadError::NonFiniteParameter("base_score"));
        }
        if self.trees.is_empty() {
            return Err(ModelLoadError::InvalidTree {
                tree: 0,
                node: 0,
                reason: "ensemble has no trees".to_string(),
            });
        }
        self.trees
            .iter()
            .enumerate()
            .try_for_each(|(index, tree)| tree.validate(index))
    }
}

impl Classifier for TreeEnsemble {
    fn kind(&self) -> &'static str {
        "tree_ensemble"
    }

    fn predict(&self, features: &FeatureVector) -> Result<bool, ScoringError> {
        Ok(self.probability(features)? >= 0.5)
    }

    fn predict_proba(&self, features: &FeatureVector) -> Option<Result<f64, ScoringError>> {
        Some(self.probability(features))
    }

    fn as_tree_ensemble(&self) -> Option<&TreeEnsemble> {
        Some(self)
    }
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}
