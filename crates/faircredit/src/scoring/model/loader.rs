use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::{Classifier, ModelArtifact, ModelDefinition, ModelLoadError};
use crate::scoring::features::{Feature, FEATURE_COUNT};

/// A validated model, ready to be shared read-only across requests.
#[derive(Clone)]
pub struct LoadedModel {
    pub name: String,
    pub version: Option<String>,
    pub classifier: Arc<dyn Classifier>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("kind", &self.classifier.kind())
            .finish()
    }
}

/// Reads and validates model artifacts. Loading happens once, at startup;
/// any failure is fatal to the caller.
pub struct ModelLoader;

impl ModelLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadedModel, ModelLoadError> {
        let path = path.as_ref();
        let origin = path.display().to_string();

        info!(path = %origin, "loading model artifact");

        let raw = fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            origin: origin.clone(),
            source,
        })?;
        Self::from_json(&raw, &origin)
    }

    /// Parses an artifact held in memory. `origin` names it in errors.
    pub fn from_json(raw: &str, origin: &str) -> Result<LoadedModel, ModelLoadError> {
        let artifact: ModelArtifact =
            serde_json::from_str(raw).map_err(|source| ModelLoadError::Parse {
                origin: origin.to_string(),
                source,
            })?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<LoadedModel, ModelLoadError> {
        let ModelArtifact {
            name,
            version,
            feature_names,
            model,
        } = artifact;

        if let Some(names) = feature_names {
            check_feature_names(&names)?;
        }

        let classifier: Arc<dyn Classifier> = match model {
            ModelDefinition::TreeEnsemble(ensemble) => {
                ensemble.validate()?;
                info!(
                    model = %name,
                    trees = ensemble.trees.len(),
                    base_score = ensemble.base_score,
                    "tree ensemble validated"
                );
                Arc::new(ensemble)
            }
            ModelDefinition::Linear(linear) => {
                linear.validate()?;
                Arc::new(linear)
            }
        };

        info!(
            model = %name,
            version = version.as_deref().unwrap_or("unversioned"),
            kind = classifier.kind(),
            "model loaded successfully"
        );

        Ok(LoadedModel {
            name,
            version,
            classifier,
        })
    }
}

fn check_feature_names(names: &[String]) -> Result<(), ModelLoadError> {
    if names.len() != FEATURE_COUNT {
        return Err(ModelLoadError::FeatureCount {
            expected: FEATURE_COUNT,
            actual: names.len(),
        });
    }

    for (index, (actual, feature)) in names.iter().zip(Feature::ALL).enumerate() {
        if actual != feature.name() {
            return Err(ModelLoadError::FeatureName {
                index,
                expected: feature.name(),
                actual: actual.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUMP: &str = r#"{
        "name": "stump",
        "version": "0.1.0",
        "model": {
            "kind": "tree_ensemble",
            "base_score": 0.0,
            "trees": [{ "nodes": [
                { "split": { "feature": 5, "threshold": 2.5, "left": 1, "right": 2, "cover": 10.0 } },
                { "leaf": { "value": -1.0, "cover": 6.0 } },
                { "leaf": { "value": 1.0, "cover": 4.0 } }
            ]}]
        }
    }"#;

    #[test]
    fn loads_tree_ensemble_from_json() {
        let model = ModelLoader::from_json(STUMP, "inline").expect("artifact loads");
        assert_eq!(model.name, "stump");
        assert_eq!(model.version.as_deref(), Some("0.1.0"));
        assert_eq!(model.classifier.kind(), "tree_ensemble");
        assert!(model.classifier.as_tree_ensemble().is_some());
    }

    #[test]
    fn loads_linear_model_without_feature_names() {
        let weights = vec!["0.0"; FEATURE_COUNT].join(",");
        let raw = format!(
            r#"{{"name":"svm","model":{{"kind":"linear","intercept":0.5,"weights":[{weights}]}}}}"#
        );
        let model = ModelLoader::from_json(&raw, "inline").expect("artifact loads");
        assert_eq!(model.classifier.kind(), "linear");
        assert!(model.version.is_none());
    }

    #[test]
    fn rejects_mismatched_feature_names() {
        let mut names: Vec<String> = Feature::ALL
            .iter()
            .map(|feature| feature.name().to_string())
            .collect();
        names.swap(13, 14);
        let err = check_feature_names(&names).expect_err("order differs");
        match err {
            ModelLoadError::FeatureName {
                index,
                expected,
                actual,
            } => {
                assert_eq!(index, 13);
                assert_eq!(expected, "existing_credits");
                assert_eq!(actual, "housing");
            }
            other => panic!("expected feature name error, got {other:?}"),
        }
    }

    #[test]
    fn reports_unreadable_and_malformed_artifacts() {
        let err = ModelLoader::load("does/not/exist.json").expect_err("missing file");
        assert!(matches!(err, ModelLoadError::Io { .. }));
        assert!(err.to_string().contains("does/not/exist.json"));

        let err = ModelLoader::from_json("{\"name\": 3}", "inline").expect_err("bad json");
        assert!(matches!(err, ModelLoadError::Parse { .. }));
    }
}
