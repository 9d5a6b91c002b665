//! Per-decision feature attribution.
//!
//! Contributions are exact path-dependent Tree SHAP values computed in the
//! ensemble's margin (log-odds) space, with node covers standing in for the
//! training distribution. They are additive: the base value plus every
//! contribution equals the model's margin for the explained applicant.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::features::{Feature, FeatureVector, FEATURE_COUNT};
use super::model::{Branch, Classifier, DecisionTree, TreeEnsemble, TreeNode};

const ADDITIVITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExplanationError {
    #[error("attribution requires a tree ensemble, but the loaded model is '{0}'")]
    UnsupportedModel(&'static str),
    #[error("model structure cannot be explained: {0}")]
    InvalidModel(String),
    #[error("feature '{name}' is not a finite number", name = .0.name())]
    NonFiniteFeature(Feature),
    #[error("attributions sum to {attributed} but the model output is {output}")]
    Inconsistent { attributed: f64, output: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: Feature,
    /// The applicant's value for the feature.
    pub value: f64,
    /// Signed push on the margin; positive moves toward approval.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    /// Expected model margin over the training distribution.
    pub base_value: f64,
    /// Model margin for the explained applicant.
    pub output_value: f64,
    /// One entry per feature, in model order.
    pub contributions: Vec<FeatureContribution>,
}

impl Attribution {
    /// Contributions by descending magnitude. Ties keep model order.
    pub fn ranked(&self) -> Vec<FeatureContribution> {
        let mut ranked = self.contributions.clone();
        ranked.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        ranked
    }

    /// Plans a waterfall chart of at most `max_display` bars. When features
    /// do not fit, the smallest ones are folded into a single trailing bar.
    /// Bars are listed largest first; stacking starts at the base value with
    /// the folded bar, so the first bar ends at the model output.
    pub fn waterfall(&self, max_display: usize) -> Waterfall {
        let max_display = max_display.max(1);
        let ranked = self.ranked();

        let (shown, folded) = if ranked.len() > max_display {
            ranked.split_at(max_display - 1)
        } else {
            ranked.split_at(ranked.len())
        };

        let mut bars: Vec<WaterfallBar> = shown
            .iter()
            .map(|item| WaterfallBar {
                label: format!("{} = {}", item.feature.name(), format_value(item.value)),
                feature: Some(item.feature),
                contribution: item.contribution,
                start: 0.0,
                end: 0.0,
            })
            .collect();

        if !folded.is_empty() {
            bars.push(WaterfallBar {
                label: format!("{} other features", folded.len()),
                feature: None,
                contribution: folded.iter().map(|item| item.contribution).sum(),
                start: 0.0,
                end: 0.0,
            });
        }

        let mut cursor = self.base_value;
        for bar in bars.iter_mut().rev() {
            bar.start = cursor;
            cursor += bar.contribution;
            bar.end = cursor;
        }

        Waterfall {
            base_value: self.base_value,
            output_value: self.output_value,
            bars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waterfall {
    pub base_value: f64,
    pub output_value: f64,
    pub bars: Vec<WaterfallBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallBar {
    pub label: String,
    /// `None` for the folded remainder bar.
    pub feature: Option<Feature>,
    pub contribution: f64,
    pub start: f64,
    pub end: f64,
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Tree SHAP explainer bound to a loaded ensemble.
pub struct TreeExplainer<'a> {
    ensemble: &'a TreeEnsemble,
    base_value: f64,
}

impl<'a> TreeExplainer<'a> {
    pub fn new(model: &'a dyn Classifier) -> Result<Self, ExplanationError> {
        let ensemble = model
            .as_tree_ensemble()
            .ok_or(ExplanationError::UnsupportedModel(model.kind()))?;
        ensemble
            .validate()
            .map_err(|err| ExplanationError::InvalidModel(err.to_string()))?;

        let base_value = ensemble.base_score
            + ensemble
                .trees
                .iter()
                .map(DecisionTree::expected_value)
                .sum::<f64>();

        Ok(Self {
            ensemble,
            base_value,
        })
    }

    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    pub fn explain(&self, features: &FeatureVector) -> Result<Attribution, ExplanationError> {
        if let Some((feature, _)) = features.first_non_finite() {
            return Err(ExplanationError::NonFiniteFeature(feature));
        }

        let output = self
            .ensemble
            .margin(features)
            .map_err(|err| ExplanationError::InvalidModel(err.to_string()))?;

        let mut phi = [0.0; FEATURE_COUNT];
        for tree in &self.ensemble.trees {
            let mut walk = PathWalk {
                tree,
                features,
                phi: &mut phi,
            };
            walk.recurse(0, &[], 1.0, 1.0, None);
        }

        let attributed = self.base_value + phi.iter().sum::<f64>();
        if (attributed - output).abs() > ADDITIVITY_TOLERANCE * output.abs().max(1.0) {
            return Err(ExplanationError::Inconsistent {
                attributed,
                output,
            });
        }

        debug!(
            base_value = self.base_value,
            output_value = output,
            "attribution computed"
        );

        Ok(Attribution {
            base_value: self.base_value,
            output_value: output,
            contributions: features
                .labeled()
                .map(|(feature, value)| FeatureContribution {
                    feature,
                    value,
                    contribution: phi[feature.index()],
                })
                .collect(),
        })
    }
}

/// One slot of the unique feature path followed down a tree.
#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

struct PathWalk<'t, 'p> {
    tree: &'t DecisionTree,
    features: &'t FeatureVector,
    phi: &'p mut [f64; FEATURE_COUNT],
}

impl PathWalk<'_, '_> {
    fn recurse(
        &mut self,
        node: usize,
        parent_path: &[PathElement],
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        let mut path = parent_path.to_vec();
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        let tree = self.tree;
        match &tree.nodes[node] {
            TreeNode::Leaf { value, .. } => {
                for index in 1..path.len() {
                    let element = path[index];
                    if let Some(feature) = element.feature {
                        let weight = unwound_path_sum(&path, index);
                        self.phi[feature] +=
                            weight * (element.one_fraction - element.zero_fraction) * value;
                    }
                }
            }
            TreeNode::Split {
                feature: split,
                threshold,
                left,
                right,
                cover,
            } => {
                let (hot, cold) = match Feature::from_index(*split) {
                    Some(column) => match DecisionTree::branch(self.features, column, *threshold) {
                        Branch::Left => (*left, *right),
                        Branch::Right => (*right, *left),
                    },
                    None => (*left, *right),
                };
                let hot_zero = tree.nodes[hot].cover() / cover;
                let cold_zero = tree.nodes[cold].cover() / cover;

                let mut incoming_zero = 1.0;
                let mut incoming_one = 1.0;
                if let Some(index) = path
                    .iter()
                    .position(|element| element.feature == Some(*split))
                {
                    incoming_zero = path[index].zero_fraction;
                    incoming_one = path[index].one_fraction;
                    unwind_path(&mut path, index);
                }

                self.recurse(hot, &path, hot_zero * incoming_zero, incoming_one, Some(*split));
                self.recurse(cold, &path, cold_zero * incoming_zero, 0.0, Some(*split));
            }
        }
    }
}

fn extend_path(
    path: &mut Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let scale = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].weight += one_fraction * path[i].weight * (i + 1) as f64 / scale;
        path[i].weight = zero_fraction * path[i].weight * (depth - i) as f64 / scale;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let scale = (depth + 1) as f64;
    let mut next_one_portion = path[depth].weight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let previous = path[i].weight;
            path[i].weight = next_one_portion * scale / ((i + 1) as f64 * one_fraction);
            next_one_portion =
                previous - path[i].weight * zero_fraction * (depth - i) as f64 / scale;
        } else {
            path[i].weight = path[i].weight * scale / (zero_fraction * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with element `index` removed.
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let scale = (depth + 1) as f64;
    let mut next_one_portion = path[depth].weight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let share = next_one_portion * scale / ((i + 1) as f64 * one_fraction);
            total += share;
            next_one_portion = path[i].weight - share * zero_fraction * (depth - i) as f64 / scale;
        } else if zero_fraction != 0.0 {
            total += path[i].weight / zero_fraction / ((depth - i) as f64 / scale);
        }
    }

    total
}
