// Patient classifiers. Each reduces a batch to an ordered list of IDs,
// preserving input order and duplicates.

use serde::Serialize;
use serde_json::Value;

use super::risk::{parse_blood_pressure, risk_thresholds::HIGH_RISK_TOTAL, total_risk};
use crate::models::{CanonicalPatient, VitalField};

/// Clinical plausibility limits used by the data-quality check.
///
/// These are deliberately separate from the sanitizer's format check:
/// a well-formed `"400/90"` survives sanitization but fails here.
pub mod plausibility {
    pub const SYSTOLIC_MAX: i64 = 300;
    pub const DIASTOLIC_MAX: i64 = 200;
    pub const AGE_MIN: i64 = 0;
    pub const AGE_MAX: i64 = 150;
    /// Exclusive lower bound (°F).
    pub const TEMP_MIN: f64 = 0.0;
    pub const TEMP_MAX: f64 = 115.0;
}

/// Fever threshold (°F), inclusive.
pub const FEVER_THRESHOLD: f64 = 99.6;

/// Patients whose total risk score is at least 4.
pub fn high_risk_patients(patients: &[CanonicalPatient]) -> Vec<String> {
    collect_ids(patients, |p| total_risk(p) >= HIGH_RISK_TOTAL)
}

/// Patients with a sanitized temperature of at least 99.6°F.
pub fn fever_patients(patients: &[CanonicalPatient]) -> Vec<String> {
    collect_ids(patients, has_fever)
}

/// Patients with a missing or implausible blood pressure, age, or temperature.
pub fn data_quality_issues(patients: &[CanonicalPatient]) -> Vec<String> {
    collect_ids(patients, |p| !failing_fields(p).is_empty())
}

pub fn has_fever(patient: &CanonicalPatient) -> bool {
    patient.temperature.is_some_and(|t| t >= FEVER_THRESHOLD)
}

fn collect_ids<F>(patients: &[CanonicalPatient], include: F) -> Vec<String>
where
    F: Fn(&CanonicalPatient) -> bool,
{
    patients
        .iter()
        .filter(|p| include(p))
        .map(|p| p.patient_id.clone())
        .collect()
}

pub fn is_plausible_blood_pressure(bp: Option<&str>) -> bool {
    use plausibility::*;
    bp.and_then(parse_blood_pressure).is_some_and(|(s, d)| {
        s > 0 && s <= SYSTOLIC_MAX && d > 0 && d <= DIASTOLIC_MAX
    })
}

pub fn is_plausible_age(age: Option<i64>) -> bool {
    use plausibility::*;
    age.is_some_and(|a| (AGE_MIN..=AGE_MAX).contains(&a))
}

pub fn is_plausible_temperature(temperature: Option<f64>) -> bool {
    use plausibility::*;
    temperature.is_some_and(|t| t > TEMP_MIN && t <= TEMP_MAX)
}

/// Vitals of this patient that fail the plausibility check, in report order.
pub fn failing_fields(patient: &CanonicalPatient) -> Vec<VitalField> {
    VitalField::ALL
        .into_iter()
        .filter(|field| match field {
            VitalField::BloodPressure => {
                !is_plausible_blood_pressure(patient.blood_pressure.as_deref())
            }
            VitalField::Age => !is_plausible_age(patient.age),
            VitalField::Temperature => !is_plausible_temperature(patient.temperature),
        })
        .collect()
}

/// One failing vital on a flagged patient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub field: VitalField,
    pub status: IssueStatus,
    /// Sanitized value, null when the field was dropped.
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Dropped during sanitization.
    Missing,
    /// Well-formed but outside clinical limits.
    OutOfRange,
}

/// Every failing vital for one flagged patient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityIssue {
    pub patient_id: String,
    pub issues: Vec<FieldIssue>,
}

/// Detailed view of [`data_quality_issues`]: same patients, same order.
pub fn data_quality_details(patients: &[CanonicalPatient]) -> Vec<DataQualityIssue> {
    patients
        .iter()
        .filter_map(|patient| {
            let issues: Vec<FieldIssue> = failing_fields(patient)
                .into_iter()
                .map(|field| FieldIssue {
                    field,
                    status: if patient.has_field(field) {
                        IssueStatus::OutOfRange
                    } else {
                        IssueStatus::Missing
                    },
                    value: patient.field_value(field),
                })
                .collect();
            (!issues.is_empty()).then(|| DataQualityIssue {
                patient_id: patient.patient_id.clone(),
                issues,
            })
        })
        .collect()
}

/// The three ID lists handed to the submission endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub high_risk_patients: Vec<String>,
    pub fever_patients: Vec<String>,
    pub data_quality_issues: Vec<String>,
}

impl Classification {
    pub fn from_patients(patients: &[CanonicalPatient]) -> Self {
        Self {
            high_risk_patients: high_risk_patients(patients),
            fever_patients: fever_patients(patients),
            data_quality_issues: data_quality_issues(patients),
        }
    }
}
