use clap::Args;
use faircredit::config::AppConfig;
use faircredit::error::AppError;
use faircredit::scoring::chart::render_text;
use faircredit::scoring::{
    ApplicantAttributes, ExplanationError, LoadedModel, ModelLoader, ScoredApplicant,
    ScoringPipeline, Waterfall, FAIRNESS_PROTOCOL_LABEL,
};
use faircredit::telemetry;
use std::path::PathBuf;
use tracing::debug;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Applicant age in years (18-100)
    #[arg(long)]
    pub(crate) age: u32,
    /// Requested credit amount
    #[arg(long)]
    pub(crate) credit_amount: f64,
    /// Loan duration in months (4-72)
    #[arg(long)]
    pub(crate) duration: u32,
    /// Checking account status code (0-3)
    #[arg(long)]
    pub(crate) checking_status: u8,
    /// Savings code (0-4)
    #[arg(long)]
    pub(crate) savings: u8,
    /// Job skill code (0-3)
    #[arg(long)]
    pub(crate) job_skill: u8,
    /// Housing code (0-2)
    #[arg(long)]
    pub(crate) housing: u8,
    /// Print a feature attribution waterfall after the decision
    #[arg(long)]
    pub(crate) explain: bool,
    /// Bars in the waterfall, including the folded remainder
    #[arg(long)]
    pub(crate) max_display: Option<usize>,
    /// Model artifact to load instead of APP_MODEL_PATH
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
}

impl ScoreArgs {
    pub(crate) fn attributes(&self) -> ApplicantAttributes {
        ApplicantAttributes {
            age: self.age,
            credit_amount: self.credit_amount,
            duration_months: self.duration,
            checking_status: self.checking_status,
            savings: self.savings,
            job_skill: self.job_skill,
            housing: self.housing,
            credit_history: None,
            employment: None,
            purpose: None,
        }
    }

    /// Folds the command-line overrides into the loaded configuration.
    pub(crate) fn apply_overrides(&mut self, config: &mut AppConfig) {
        if let Some(model) = self.model.take() {
            config.model.path = model;
        }
        if let Some(max_display) = self.max_display.take() {
            config.explanation.max_display = max_display.max(2);
        }
    }
}

pub(crate) fn run_score(mut args: ScoreArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    args.apply_overrides(&mut config);

    telemetry::init(&config.telemetry)?;

    let model = ModelLoader::load(&config.model.path)?;
    let pipeline = ScoringPipeline::new(&model);
    let scored = pipeline.score(args.attributes())?;
    debug!(
        model = %model.name,
        approved = scored.result.approved,
        confidence = scored.result.confidence,
        "cli applicant scored"
    );

    print!("{}", render_decision(&model, &scored));

    if args.explain {
        let waterfall = pipeline
            .explain(&scored)
            .map(|attribution| attribution.waterfall(config.explanation.max_display));
        print!("{}", render_explanation(&waterfall));
    }

    Ok(())
}

fn render_decision(model: &LoadedModel, scored: &ScoredApplicant) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "FairCredit decision (model {} {})\n",
        model.name,
        model.version.as_deref().unwrap_or("unversioned")
    ));
    out.push_str(&format!(
        "  Applicant: {} years, {}\n",
        scored.attributes.age,
        scored.age_group.label()
    ));
    out.push_str(&format!("  Fairness protocol: {FAIRNESS_PROTOCOL_LABEL}\n"));

    let result = &scored.result;
    if result.approved {
        out.push_str("  LOAN APPROVED\n");
        out.push_str(&format!("  Confidence score: {:.1}%\n", result.confidence * 100.0));
    } else {
        out.push_str("  LOAN REJECTED\n");
        out.push_str(&format!("  Risk score: {:.1}%\n", result.risk() * 100.0));
    }
    out
}

fn render_explanation(waterfall: &Result<Waterfall, ExplanationError>) -> String {
    match waterfall {
        Ok(waterfall) => format!("\nExplanation (log-odds of approval)\n{}", render_text(waterfall)),
        Err(err) => format!("\nExplanation unavailable: {err}\n"),
    }
}
