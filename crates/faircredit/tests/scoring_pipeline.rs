use std::sync::Arc;

use faircredit::scoring::model::LinearClassifier;
use faircredit::scoring::{
    AgeGroup, ApplicantAttributes, DashboardSelections, ExplanationError, Feature,
    FeatureVector, FinancialStanding, LoadedModel, ModelLoader, PipelineError, ProbabilitySource,
    ScoringPipeline, FEATURE_COUNT,
};

const BUNDLED_MODEL: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../models/fair_credit_model.json"
);

fn bundled_model() -> LoadedModel {
    ModelLoader::load(BUNDLED_MODEL).expect("bundled artifact loads")
}

fn reference_applicant() -> ApplicantAttributes {
    ApplicantAttributes {
        age: 30,
        credit_amount: 5000.0,
        duration_months: 24,
        checking_status: 1,
        savings: 2,
        job_skill: 1,
        housing: 1,
        credit_history: None,
        employment: None,
        purpose: None,
    }
}

fn linear_model() -> LoadedModel {
    let mut weights = vec![0.0; FEATURE_COUNT];
    weights[Feature::Savings.index()] = 0.8;
    weights[Feature::Duration.index()] = -0.05;
    LoadedModel {
        name: "svm-margin".to_string(),
        version: None,
        classifier: Arc::new(LinearClassifier {
            intercept: 0.0,
            weights,
        }),
    }
}

#[test]
fn bundled_artifact_is_a_tree_ensemble() {
    let model = bundled_model();
    assert_eq!(model.name, "fair-credit-gbt");
    assert_eq!(model.version.as_deref(), Some("1.0.0"));
    assert!(model.classifier.as_tree_ensemble().is_some());
}

#[test]
fn reference_applicant_assembles_and_scores() {
    let pipeline = ScoringPipeline::new(&bundled_model());
    let scored = pipeline
        .score(reference_applicant())
        .expect("reference applicant scores");

    let mut expected = [0.0; FEATURE_COUNT];
    expected[0] = 1.0;
    expected[1] = 24.0;
    expected[4] = 5000.0;
    expected[5] = 2.0;
    expected[11] = 30.0;
    expected[14] = 1.0;
    expected[16] = 1.0;
    expected[19] = 1.0;
    assert_eq!(scored.features.as_slice(), &expected[..]);

    assert_eq!(scored.age_group, AgeGroup::Adult);
    assert!((0.0..=1.0).contains(&scored.result.confidence));
    assert_eq!(scored.result.probability_source, ProbabilitySource::Model);
    assert_eq!(scored.result.approved, scored.result.confidence >= 0.5);
}

#[test]
fn scoring_is_deterministic() {
    let pipeline = ScoringPipeline::new(&bundled_model());
    let first = pipeline.score(reference_applicant()).expect("scores");
    let second = pipeline.score(reference_applicant()).expect("scores");
    assert_eq!(first, second);
}

#[test]
fn standing_tiers_move_the_decision() {
    let pipeline = ScoringPipeline::new(&bundled_model());
    let score = |standing| {
        let selections = DashboardSelections {
            standing,
            ..DashboardSelections::default()
        };
        pipeline
            .score(selections.to_attributes())
            .expect("dashboard defaults score")
    };

    let wealthy = score(FinancialStanding::Wealthy);
    let poor = score(FinancialStanding::Poor);

    for (scored, codes) in [(&wealthy, (2.0, 3.0, 2.0, 3.0)), (&poor, (0.0, 0.0, 0.0, 0.0))] {
        let actual = (
            scored.features.get(Feature::Status),
            scored.features.get(Feature::Savings),
            scored.features.get(Feature::CreditHistory),
            scored.features.get(Feature::Employment),
        );
        assert_eq!(actual, codes);
    }

    assert_eq!(wealthy.age_group, AgeGroup::Youth);
    assert!(wealthy.result.approved);
    assert!(!poor.result.approved);
    assert!(wealthy.result.confidence > poor.result.confidence);
}

#[test]
fn explanation_adds_up_to_the_model_margin() {
    let model = bundled_model();
    let pipeline = ScoringPipeline::new(&model);
    let scored = pipeline.score(reference_applicant()).expect("scores");
    let attribution = pipeline.explain(&scored).expect("tree model explains");

    assert_eq!(attribution.contributions.len(), FEATURE_COUNT);
    let total: f64 = attribution
        .contributions
        .iter()
        .map(|c| c.contribution)
        .sum();
    assert!((attribution.base_value + total - attribution.output_value).abs() < 1e-9);

    let probability = 1.0 / (1.0 + (-attribution.output_value).exp());
    assert!((probability - scored.result.confidence).abs() < 1e-12);

    let untouched = attribution
        .contributions
        .iter()
        .find(|c| c.feature == Feature::Telephone)
        .expect("every feature attributed");
    assert_eq!(untouched.contribution, 0.0);

    let waterfall = attribution.waterfall(7);
    assert_eq!(waterfall.bars.len(), 7);
    let top = waterfall.bars.first().expect("bars present");
    assert!((top.end - attribution.output_value).abs() < 1e-9);
}

#[test]
fn margin_model_falls_back_to_decision_and_cannot_be_explained() {
    let pipeline = ScoringPipeline::new(&linear_model());
    let scored = pipeline.score(reference_applicant()).expect("scores");

    // 0.8 * 2 - 0.05 * 24 = 0.4
    assert!(scored.result.approved);
    assert_eq!(scored.result.confidence, 1.0);
    assert_eq!(scored.result.probability_source, ProbabilitySource::Decision);

    let before = scored.clone();
    let err = pipeline.explain(&scored).expect_err("no tree structure");
    assert!(matches!(err, ExplanationError::UnsupportedModel("linear")));
    assert_eq!(scored, before);
}

#[test]
fn invalid_applicants_never_reach_the_model() {
    let pipeline = ScoringPipeline::new(&bundled_model());
    let err = pipeline
        .score(ApplicantAttributes {
            age: 17,
            ..reference_applicant()
        })
        .expect_err("under age");
    assert!(matches!(err, PipelineError::Applicant(_)));

    let err = FeatureVector::from_slice(&[0.0; 19]).expect_err("short vector");
    assert!(err.to_string().contains("20"));
}
