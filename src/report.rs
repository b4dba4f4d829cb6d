// Console rendering of an assessment run.

use crate::pipeline::{AssessmentSummary, DataQualityIssue, IssueStatus};
use crate::submit::SubmissionOutcome;

/// IDs shown per list before collapsing the rest into a count.
const PREVIEW_IDS: usize = 10;

const RULE_WIDTH: usize = 80;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn heading(out: &mut String, title: &str) {
    out.push_str(&format!("{}\n{title}\n{}\n", rule(), rule()));
}

/// `"A, B, C ... (7 more)"`.
pub fn preview_ids(ids: &[String]) -> String {
    let shown = ids
        .iter()
        .take(PREVIEW_IDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if ids.len() > PREVIEW_IDS {
        format!("{shown} ... ({} more)", ids.len() - PREVIEW_IDS)
    } else {
        shown
    }
}

/// Totals and ID previews for each list.
pub fn render_summary(summary: &AssessmentSummary) -> String {
    let c = &summary.classification;
    let mut out = String::new();
    heading(&mut out, "CLASSIFICATION SUMMARY");
    out.push_str(&format!("Run: {}\n", summary.run_id));
    out.push_str(&format!("Fetched at: {}\n", summary.fetched_at.to_rfc3339()));
    out.push_str(&format!(
        "Pages fetched: {}{}\n",
        summary.pages_fetched,
        summary
            .source_pages
            .map(|t| format!(" of {t}"))
            .unwrap_or_default()
    ));
    out.push_str(&format!("Total Patients: {}\n", summary.total_patients));
    out.push_str(&format!("High-Risk Patients: {}\n", c.high_risk_patients.len()));
    out.push_str(&format!("Fever Patients: {}\n", c.fever_patients.len()));
    out.push_str(&format!("Data Quality Issues: {}\n", c.data_quality_issues.len()));

    for (label, ids) in [
        ("High-Risk IDs", &c.high_risk_patients),
        ("Fever IDs", &c.fever_patients),
        ("Data Quality IDs", &c.data_quality_issues),
    ] {
        if !ids.is_empty() {
            out.push_str(&format!("{label}: {}\n", preview_ids(ids)));
        }
    }

    for failure in &summary.failures {
        out.push_str(&format!("Warning: {failure}\n"));
    }
    out
}

/// Per-patient breakdown of failing vitals.
pub fn render_data_quality(details: &[DataQualityIssue]) -> String {
    let mut out = String::new();
    heading(&mut out, "DATA QUALITY REPORT");
    if details.is_empty() {
        out.push_str("No data quality issues found.\n");
        return out;
    }
    for detail in details {
        out.push_str(&format!("Patient ID: {}\n", detail.patient_id));
        for issue in &detail.issues {
            let status = match issue.status {
                IssueStatus::Missing => "missing/invalid",
                IssueStatus::OutOfRange => "out of range",
            };
            out.push_str(&format!(
                "  - {} ({}): {status} (value: {})\n",
                issue.field,
                issue.field.default_unit(),
                issue.value
            ));
        }
    }
    out
}

/// Pretty-printed submission response or error object.
pub fn render_submission(outcome: &SubmissionOutcome) -> String {
    let mut out = String::new();
    heading(&mut out, "ASSESSMENT SUBMISSION RESULTS");
    let body = match outcome {
        Ok(value) => serde_json::to_string_pretty(value),
        Err(err) => serde_json::to_string_pretty(err),
    };
    out.push_str(&format!("{}\n", body.unwrap_or_else(|e| e.to_string())));
    out.push_str(&format!("{}\n", rule()));
    out
}
