//! The fitted model artifact and the classifier seam the scorer talks to.

mod linear;
mod loader;
mod tree;

pub use linear::LinearClassifier;
pub use loader::{LoadedModel, ModelLoader};
pub use tree::{sigmoid, Branch, DecisionTree, TreeEnsemble, TreeNode};

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;
use super::scorer::ScoringError;

/// Capabilities of an opaque binary classifier. Only `predict` is mandatory;
/// probability estimates and tree structure are optional.
pub trait Classifier: Send + Sync {
    fn kind(&self) -> &'static str;

    fn predict(&self, features: &FeatureVector) -> Result<bool, ScoringError>;

    /// Positive-class probability, when the model can estimate one.
    fn predict_proba(&self, _features: &FeatureVector) -> Option<Result<f64, ScoringError>> {
        None
    }

    /// Tree structure for attribution, when the model is a tree ensemble.
    fn as_tree_ensemble(&self) -> Option<&TreeEnsemble> {
        None
    }
}

/// On-disk JSON form of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Column order the model was fitted on. Checked against the service
    /// layout when present.
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub model: ModelDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelDefinition {
    TreeEnsemble(TreeEnsemble),
    Linear(LinearClassifier),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to read model artifact {origin}: {source}")]
    Io {
        origin: String,
        source: std::io::Error,
    },
    #[error("failed to parse model artifact {origin}: {source}")]
    Parse {
        origin: String,
        source: serde_json::Error,
    },
    #[error("model expects {actual} features, service assembles {expected}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("feature {index} is '{actual}' in the artifact but '{expected}' in the service layout")]
    FeatureName {
        index: usize,
        expected: &'static str,
        actual: String,
    },
    #[error("tree {tree}, node {node}: {reason}")]
    InvalidTree {
        tree: usize,
        node: usize,
        reason: String,
    },
    #[error("model parameter '{0}' is not finite")]
    NonFiniteParameter(&'static str),
}
