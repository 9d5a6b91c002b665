//! Server-rendered HTML for the audit dashboard.

use faircredit::scoring::chart::escape_html;
use faircredit::scoring::selections::CREDIT_AMOUNT_RANGE;
use faircredit::scoring::{
    FinancialStanding, HousingLabel, JobLabel, ScoredApplicant, Sex, FAIRNESS_PROTOCOL_LABEL,
};
use std::fmt::Write as _;

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex;color:#222}\
aside{width:260px;padding:20px;background:#f0f2f6;min-height:100vh}\
aside label{display:block;margin-top:12px;font-size:14px}\
aside input,aside select{width:100%;margin-top:4px;padding:4px}\
main{flex:1;padding:24px 40px}\
.metrics{display:flex;gap:24px}.metric{flex:1}\
.panel{padding:12px 16px;border-radius:6px;margin:12px 0}\
.ok{background:#e6f4ea;color:#1e6b34}.bad{background:#fde8e8;color:#9b1c1c}\
.info{background:#e8f0fe;color:#1a4b8c}\
progress{width:100%;height:14px}";

/// Form values echoed back into the sidebar, as the operator typed them.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FormValues {
    pub(crate) age: String,
    pub(crate) credit_amount: String,
    pub(crate) duration: String,
    pub(crate) sex: Sex,
    pub(crate) housing: HousingLabel,
    pub(crate) job: JobLabel,
    pub(crate) standing: FinancialStanding,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Explanation {
    NotRequested,
    Chart(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Scored {
        scored: ScoredApplicant,
        sex: Sex,
        explanation: Explanation,
    },
    Invalid(String),
}

pub(crate) fn render(form: &FormValues, outcome: &Outcome) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <title>FairCredit: AI Governance Audit</title><style>{STYLE}</style></head><body>"
    );
    render_form(&mut html, form);

    html.push_str("<main><h1>FairCredit: AI Governance Audit</h1>");
    html.push_str("<h3>Ethical Credit Scoring Engine</h3><hr>");

    match outcome {
        Outcome::Invalid(message) => {
            let _ = write!(
                html,
                "<div class=\"panel bad\" id=\"input-error\"><strong>Invalid application:</strong> {}</div>",
                escape_html(message)
            );
        }
        Outcome::Scored {
            scored,
            sex,
            explanation,
        } => {
            render_metrics(&mut html, scored, *sex);
            render_decision(&mut html, scored);
            render_explanation(&mut html, explanation);
        }
    }

    html.push_str("</main></body></html>");
    html
}

fn render_form(html: &mut String, form: &FormValues) {
    html.push_str("<aside><form method=\"get\" action=\"/\"><h3>Applicant Profile</h3>");
    number_input(html, "Age", "age", &form.age, "18", "100", "1");
    number_input(
        html,
        "Credit Amount",
        "credit_amount",
        &form.credit_amount,
        &CREDIT_AMOUNT_RANGE.start().to_string(),
        &CREDIT_AMOUNT_RANGE.end().to_string(),
        "1",
    );
    number_input(html, "Duration (months)", "duration", &form.duration, "4", "72", "1");

    select(
        html,
        "Sex",
        "sex",
        &[("Male", "Male"), ("Female", "Female")],
        match form.sex {
            Sex::Male => "Male",
            Sex::Female => "Female",
        },
    );
    select(
        html,
        "Housing",
        "housing",
        &[("Own", "Own"), ("Rent", "Rent"), ("Free", "Free")],
        match form.housing {
            HousingLabel::Own => "Own",
            HousingLabel::Rent => "Rent",
            HousingLabel::Free => "Free",
        },
    );
    select(
        html,
        "Job",
        "job",
        &[
            ("Unskilled", "Unskilled"),
            ("Skilled", "Skilled"),
            ("Management", "Management"),
        ],
        match form.job {
            JobLabel::Unskilled => "Unskilled",
            JobLabel::Skilled => "Skilled",
            JobLabel::Management => "Management",
        },
    );

    html.push_str("<hr><h4>Financial Background</h4>");
    select(
        html,
        "Financial Standing",
        "standing",
        &[
            ("Wealthy", FinancialStanding::Wealthy.label()),
            ("Average", FinancialStanding::Average.label()),
            ("Poor", FinancialStanding::Poor.label()),
        ],
        match form.standing {
            FinancialStanding::Wealthy => "Wealthy",
            FinancialStanding::Average => "Average",
            FinancialStanding::Poor => "Poor",
        },
    );

    html.push_str(
        "<p><button type=\"submit\" name=\"explain\" value=\"true\">\
         Generate Explanation Report</button></p></form></aside>",
    );
}

fn number_input(
    html: &mut String,
    label: &str,
    name: &str,
    value: &str,
    min: &str,
    max: &str,
    step: &str,
) {
    let _ = write!(
        html,
        "<label>{label}<input type=\"number\" name=\"{name}\" value=\"{}\" \
         min=\"{min}\" max=\"{max}\" step=\"{step}\" onchange=\"this.form.submit()\"></label>",
        escape_html(value)
    );
}

fn select(html: &mut String, label: &str, name: &str, options: &[(&str, &str)], current: &str) {
    let _ = write!(
        html,
        "<label>{label}<select name=\"{name}\" onchange=\"this.form.submit()\">"
    );
    for (value, text) in options {
        let selected = if *value == current { " selected" } else { "" };
        let _ = write!(html, "<option value=\"{value}\"{selected}>{text}</option>");
    }
    html.push_str("</select></label>");
}

fn render_metrics(html: &mut String, scored: &ScoredApplicant, sex: Sex) {
    let group = scored.age_group;
    let badge_class = if group.is_protected() { "bad" } else { "ok" };
    let sex_label = match sex {
        Sex::Male => "Male",
        Sex::Female => "Female",
    };

    let _ = write!(
        html,
        "<div class=\"metrics\">\
         <div class=\"metric\"><small>Applicant Age</small><h2>{} years</h2><small>{sex_label}</small></div>\
         <div class=\"metric\"><div class=\"panel {badge_class}\" id=\"age-group\">{}</div></div>\
         <div class=\"metric\"><small>Fairness Protocol</small><h2 id=\"fairness\">{FAIRNESS_PROTOCOL_LABEL}</h2></div>\
         </div>",
        scored.attributes.age,
        group.label()
    );
}

fn render_decision(html: &mut String, scored: &ScoredApplicant) {
    let result = &scored.result;
    html.push_str("<h3>AI Decision Engine</h3><div id=\"decision\">");
    if result.approved {
        let _ = write!(
            html,
            "<div class=\"panel ok\"><h2>LOAN APPROVED</h2>\
             <p><strong>Confidence Score:</strong> {:.1}%</p>\
             <progress max=\"100\" value=\"{}\"></progress></div>",
            result.confidence * 100.0,
            percent(result.confidence)
        );
    } else {
        let _ = write!(
            html,
            "<div class=\"panel bad\"><h2>LOAN REJECTED</h2>\
             <p><strong>Risk Score:</strong> {:.1}%</p>\
             <progress max=\"100\" value=\"{}\"></progress></div>",
            result.risk() * 100.0,
            percent(result.risk())
        );
    }
    let _ = write!(
        html,
        "<div class=\"panel info\"><small>The model reports being trained under the \
         \"{FAIRNESS_PROTOCOL_LABEL}\" protocol. This label is declared by the model \
         owner and is not measured by this dashboard.</small></div></div>"
    );
}

fn render_explanation(html: &mut String, explanation: &Explanation) {
    html.push_str(
        "<hr><h3>Explainability Analysis (Why?)</h3>\
         <p>This chart shows which factors pushed the score toward approval (red) \
         or toward rejection (blue).</p>",
    );
    match explanation {
        Explanation::NotRequested => {
            html.push_str("<p><small>Use \"Generate Explanation Report\" to compute the chart.</small></p>");
        }
        Explanation::Chart(svg) => {
            let _ = write!(html, "<div id=\"explanation\">{svg}</div>");
        }
        Explanation::Failed(message) => {
            let _ = write!(
                html,
                "<div class=\"panel bad\" id=\"explanation-error\">\
                 <strong>Explanation unavailable:</strong> {}</div>",
                escape_html(message)
            );
        }
    }
}

fn percent(value: f64) -> u32 {
    (value.clamp(0.0, 1.0) * 100.0) as u32
}
