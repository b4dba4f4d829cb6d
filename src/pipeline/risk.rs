use serde::{Deserialize, Serialize};

use super::sanitize::saturating_parse_i64;
use crate::models::CanonicalPatient;

/// Risk score thresholds for each vital.
pub mod risk_thresholds {
    /// Systolic at or above this scores 1 (elevated).
    pub const SYSTOLIC_ELEVATED: i64 = 120;
    /// Systolic at or above this scores 2 (stage 1).
    pub const SYSTOLIC_STAGE_1: i64 = 130;
    /// Systolic at or above this scores 3 (stage 2).
    pub const SYSTOLIC_STAGE_2: i64 = 140;

    /// Diastolic at or above this scores 2 (stage 1).
    pub const DIASTOLIC_STAGE_1: i64 = 80;
    /// Diastolic at or above this scores 3 (stage 2).
    pub const DIASTOLIC_STAGE_2: i64 = 90;

    /// Highest temperature still scored as normal (°F).
    pub const TEMP_NORMAL_MAX: f64 = 99.5;
    /// Low fever band, inclusive at both ends (°F). Anything else above
    /// `TEMP_NORMAL_MAX` scores as high fever.
    pub const TEMP_LOW_FEVER_MIN: f64 = 99.6;
    pub const TEMP_LOW_FEVER_MAX: f64 = 100.9;

    /// Ages from here through `AGE_MIDDLE_MAX` score 1.
    pub const AGE_MIDDLE_MIN: i64 = 40;
    pub const AGE_MIDDLE_MAX: i64 = 65;

    /// Total score at or above which a patient is high-risk.
    pub const HIGH_RISK_TOTAL: u8 = 4;
}

use risk_thresholds::*;

/// Upper bound of each sub-score.
pub const MAX_BP_RISK: u8 = 3;
pub const MAX_TEMP_RISK: u8 = 2;
pub const MAX_AGE_RISK: u8 = 2;

/// Split `"S/D"` into integers. Anything else yields `None`.
/// Readings too large for `i64` clamp to `i64::MAX`.
pub fn parse_blood_pressure(bp: &str) -> Option<(i64, i64)> {
    let (systolic, diastolic) = bp.split_once('/')?;
    let systolic = saturating_parse_i64(systolic.trim())?;
    let diastolic = saturating_parse_i64(diastolic.trim())?;
    Some((systolic, diastolic))
}

fn systolic_bucket(systolic: i64) -> u8 {
    if systolic < SYSTOLIC_ELEVATED {
        0
    } else if systolic < SYSTOLIC_STAGE_1 {
        1
    } else if systolic < SYSTOLIC_STAGE_2 {
        2
    } else {
        3
    }
}

fn diastolic_bucket(diastolic: i64) -> u8 {
    if diastolic < DIASTOLIC_STAGE_1 {
        0
    } else if diastolic < DIASTOLIC_STAGE_2 {
        2
    } else {
        3
    }
}

/// Blood pressure sub-score (0-3): the higher of the systolic and diastolic buckets.
pub fn bp_risk(blood_pressure: Option<&str>) -> u8 {
    blood_pressure
        .and_then(parse_blood_pressure)
        .map_or(0, |(s, d)| systolic_bucket(s).max(diastolic_bucket(d)))
}

/// Temperature sub-score (0-2).
pub fn temp_risk(temperature: Option<f64>) -> u8 {
    match temperature {
        Some(t) if t.is_finite() => {
            if t <= TEMP_NORMAL_MAX {
                0
            } else if (TEMP_LOW_FEVER_MIN..=TEMP_LOW_FEVER_MAX).contains(&t) {
                1
            } else {
                2
            }
        }
        _ => 0,
    }
}

/// Age sub-score (0-2).
pub fn age_risk(age: Option<i64>) -> u8 {
    match age {
        Some(a) if a < AGE_MIDDLE_MIN => 0,
        Some(a) if a <= AGE_MIDDLE_MAX => 1,
        Some(_) => 2,
        None => 0,
    }
}

/// Sum of the three sub-scores (0-8).
pub fn total_risk(patient: &CanonicalPatient) -> u8 {
    risk_scores(patient).total_score
}

/// Per-vital scores for one patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScores {
    pub bp_score: u8,
    pub temp_score: u8,
    pub age_score: u8,
    pub total_score: u8,
}

/// Scores plus the patient they belong to, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub patient_id: String,
    #[serde(flatten)]
    pub scores: RiskScores,
}

pub fn risk_scores(patient: &CanonicalPatient) -> RiskScores {
    let bp_score = bp_risk(patient.blood_pressure.as_deref());
    let temp_score = temp_risk(patient.temperature);
    let age_score = age_risk(patient.age);
    RiskScores {
        bp_score,
        temp_score,
        age_score,
        total_score: bp_score + temp_score + age_score,
    }
}

pub fn risk_breakdown(patient: &CanonicalPatient) -> RiskBreakdown {
    RiskBreakdown::for_patient(patient)
}

impl RiskBreakdown {
    pub fn for_patient(patient: &CanonicalPatient) -> Self {
        Self {
            patient_id: patient.patient_id.clone(),
            scores: risk_scores(patient),
        }
    }

    pub fn is_high_risk(&self) -> bool {
        self.scores.total_score >= HIGH_RISK_TOTAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn patient(age: Option<i64>, bp: Option<&str>, temp: Option<f64>) -> CanonicalPatient {
        CanonicalPatient::new("TEST", age, bp, temp)
    }

    #[test]
    fn systolic_bucket_edges() {
        assert_eq!(bp_risk(Some("119/70")), 0);
        assert_eq!(bp_risk(Some("120/70")), 1);
        assert_eq!(bp_risk(Some("129/70")), 1);
        assert_eq!(bp_risk(Some("130/70")), 2);
        assert_eq!(bp_risk(Some("139/70")), 2);
        assert_eq!(bp_risk(Some("140/70")), 3);
    }

    #[test]
    fn diastolic_bucket_edges() {
        assert_eq!(bp_risk(Some("110/79")), 0);
        assert_eq!(bp_risk(Some("110/80")), 2);
        assert_eq!(bp_risk(Some("110/89")), 2);
        assert_eq!(bp_risk(Some("110/90")), 3);
    }

    #[test]
    fn bp_takes_higher_of_the_two_buckets() {
        assert_eq!(bp_risk(Some("125/85")), 2);
        assert_eq!(bp_risk(Some("145/70")), 3);
        assert_eq!(bp_risk(Some("118/95")), 3);
    }

    #[test]
    fn bp_unparseable_or_missing_scores_zero() {
        assert_eq!(bp_risk(None), 0);
        assert_eq!(bp_risk(Some("")), 0);
        assert_eq!(bp_risk(Some("INVALID")), 0);
        assert_eq!(bp_risk(Some("150/")), 0);
        assert_eq!(bp_risk(Some("1/2/3")), 0);
    }

    #[test]
    fn temperature_bucket_edges() {
        assert_eq!(temp_risk(Some(98.6)), 0);
        assert_eq!(temp_risk(Some(99.5)), 0);
        assert_eq!(temp_risk(Some(99.6)), 1);
        assert_eq!(temp_risk(Some(100.9)), 1);
        assert_eq!(temp_risk(Some(101.0)), 2);
        assert_eq!(temp_risk(Some(104.2)), 2);
        assert_eq!(temp_risk(None), 0);
        assert_eq!(temp_risk(Some(f64::NAN)), 0);
    }

    #[test]
    fn temperature_between_published_bands_scores_high() {
        assert_eq!(temp_risk(Some(99.55)), 2);
        assert_eq!(temp_risk(Some(100.95)), 2);
    }

    #[test]
    fn oversized_bp_reading_clamps_to_stage_two() {
        assert_eq!(
            parse_blood_pressure("99999999999999999999/80"),
            Some((i64::MAX, 80))
        );
        assert_eq!(bp_risk(Some("99999999999999999999/80")), 3);
        assert_eq!(bp_risk(Some("110/99999999999999999999")), 3);
    }

    #[test]
    fn oversized_bp_from_sanitizer_is_scored() {
        let raw = serde_json::json!({"patient_id": "BIG", "blood_pressure": "99999999999999999999/80"});
        let p = crate::pipeline::sanitize::sanitize_patient(raw.as_object().unwrap());
        assert_eq!(p.blood_pressure.as_deref(), Some("99999999999999999999/80"));
        assert_eq!(risk_scores(&p).bp_score, 3);
    }

    #[test]
    fn age_bucket_edges() {
        assert_eq!(age_risk(Some(39)), 0);
        assert_eq!(age_risk(Some(40)), 1);
        assert_eq!(age_risk(Some(65)), 1);
        assert_eq!(age_risk(Some(66)), 2);
        assert_eq!(age_risk(None), 0);
    }

    #[test]
    fn healthy_adult_scores_zero() {
        let p = patient(Some(35), Some("119/79"), Some(98.6));
        assert_eq!(total_risk(&p), 0);
    }

    #[test]
    fn middle_aged_stage_one_with_low_fever_scores_four() {
        let p = patient(Some(50), Some("135/79"), Some(99.6));
        let scores = risk_scores(&p);
        assert_eq!(scores.bp_score, 2);
        assert_eq!(scores.temp_score, 1);
        assert_eq!(scores.age_score, 1);
        assert_eq!(scores.total_score, 4);
    }

    #[test]
    fn missing_age_contributes_nothing() {
        let p = patient(None, Some("120/80"), Some(101.0));
        let scores = risk_scores(&p);
        assert_eq!(scores.age_score, 0);
        assert_eq!(scores.temp_score, 2);
        assert_eq!(scores.bp_score, 2);
        assert_eq!(scores.total_score, 4);
    }

    #[test]
    fn breakdown_carries_patient_id() {
        let mut p = patient(Some(70), Some("150/95"), Some(102.0));
        p.patient_id = "DEMO009".into();
        let breakdown = RiskBreakdown::for_patient(&p);
        assert_eq!(breakdown.patient_id, "DEMO009");
        assert_eq!(breakdown.scores.total_score, 7);
        assert!(breakdown.is_high_risk());
    }

    #[test]
    fn breakdown_serializes_flat() {
        let p = patient(Some(30), None, None);
        let json = serde_json::to_value(RiskBreakdown::for_patient(&p)).unwrap();
        assert_eq!(json["patient_id"], "TEST");
        assert_eq!(json["total_score"], 0);
        assert_eq!(json["bp_score"], 0);
    }

    proptest! {
        #[test]
        fn total_is_sum_of_bounded_sub_scores(
            age in proptest::option::of(-10i64..200),
            systolic in 0i64..400,
            diastolic in 0i64..300,
            has_bp in any::<bool>(),
            temp in proptest::option::of(80.0f64..110.0),
        ) {
            let bp = has_bp.then(|| format!("{systolic}/{diastolic}"));
            let p = patient(age, bp.as_deref(), temp);
            let scores = risk_scores(&p);
            prop_assert!(scores.bp_score <= MAX_BP_RISK);
            prop_assert!(scores.temp_score <= MAX_TEMP_RISK);
            prop_assert!(scores.age_score <= MAX_AGE_RISK);
            prop_assert_eq!(
                scores.total_score,
                scores.bp_score + scores.temp_score + scores.age_score
            );
            prop_assert_eq!(total_risk(&p), scores.total_score);
        }
    }
}
