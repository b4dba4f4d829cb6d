// Sanitize raw upstream patient records into canonical form.
// Every field degrades to None on bad input; nothing here returns an error.

use std::collections::HashSet;
use std::num::IntErrorKind;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::{CanonicalPatient, FieldParse, RawRecord, VitalField, PATIENT_ID_KEY};

/// Digits, a slash, digits. Nothing else, no inner whitespace.
static BP_FORMAT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+/[0-9]+$").unwrap());

/// Placeholder strings upstream systems send instead of a blood pressure.
pub const DEFAULT_BP_SENTINELS: &[&str] = &["N/A", "NA", "INVALID", "UNKNOWN", "INVALID_BP_FORMAT"];

/// Placeholder strings upstream systems send instead of a temperature.
pub const DEFAULT_TEMPERATURE_SENTINELS: &[&str] = &["TEMP_ERROR", "INVALID", "UNKNOWN", "N/A", "NA"];

/// Identifier used when a record carries no patient_id at all.
const MISSING_PATIENT_ID: &str = "None";

/// Case-insensitive set of placeholder tokens treated as absent data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentinelSet {
    tokens: HashSet<String>,
}

impl SentinelSet {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_uppercase())
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Add one more token, e.g. a localized placeholder.
    pub fn with(mut self, token: &str) -> Self {
        self.tokens.insert(token.trim().to_uppercase());
        self
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.tokens.contains(&candidate.trim().to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Converts raw records into [`CanonicalPatient`]s.
///
/// Holds one sentinel set per vital so callers can extend or replace the
/// placeholder vocabulary without touching the parsing rules.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    age_sentinels: SentinelSet,
    bp_sentinels: SentinelSet,
    temperature_sentinels: SentinelSet,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            age_sentinels: SentinelSet::empty(),
            bp_sentinels: SentinelSet::new(DEFAULT_BP_SENTINELS),
            temperature_sentinels: SentinelSet::new(DEFAULT_TEMPERATURE_SENTINELS),
        }
    }
}

impl Sanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the sentinel vocabulary for one field.
    pub fn with_sentinels(mut self, field: VitalField, sentinels: SentinelSet) -> Self {
        match field {
            VitalField::Age => self.age_sentinels = sentinels,
            VitalField::BloodPressure => self.bp_sentinels = sentinels,
            VitalField::Temperature => self.temperature_sentinels = sentinels,
        }
        self
    }

    pub fn sentinels(&self, field: VitalField) -> &SentinelSet {
        match field {
            VitalField::Age => &self.age_sentinels,
            VitalField::BloodPressure => &self.bp_sentinels,
            VitalField::Temperature => &self.temperature_sentinels,
        }
    }

    /// Build a canonical patient from one raw record. Total: never fails.
    pub fn sanitize(&self, raw: &RawRecord) -> CanonicalPatient {
        let patient_id = coerce_patient_id(raw.get(PATIENT_ID_KEY));

        let age = self.parse_age(field(raw, VitalField::Age));
        let blood_pressure = self.parse_blood_pressure(field(raw, VitalField::BloodPressure));
        let temperature = self.parse_temperature(field(raw, VitalField::Temperature));

        for (vital, malformed) in [
            (VitalField::Age, matches!(age, FieldParse::Malformed)),
            (VitalField::BloodPressure, matches!(blood_pressure, FieldParse::Malformed)),
            (VitalField::Temperature, matches!(temperature, FieldParse::Malformed)),
        ] {
            if malformed {
                tracing::debug!(patient_id = %patient_id, field = %vital, "Malformed vital dropped");
            }
        }

        CanonicalPatient {
            patient_id,
            age: age.into_option(),
            blood_pressure: blood_pressure.into_option(),
            temperature: temperature.into_option(),
        }
    }

    /// Sanitize a whole page, preserving input order.
    pub fn sanitize_all<'a, I>(&self, records: I) -> Vec<CanonicalPatient>
    where
        I: IntoIterator<Item = &'a RawRecord>,
    {
        records.into_iter().map(|raw| self.sanitize(raw)).collect()
    }

    /// `"systolic/diastolic"` format check only. Numeric ranges are not judged here.
    pub fn parse_blood_pressure(&self, value: Option<&Value>) -> FieldParse<String> {
        let text = match coerce_text(value) {
            FieldParse::Valid(text) => text,
            FieldParse::Missing => return FieldParse::Missing,
            FieldParse::Malformed => return FieldParse::Malformed,
        };

        if self.bp_sentinels.contains(&text) || !BP_FORMAT.is_match(&text) {
            return FieldParse::Malformed;
        }
        FieldParse::Valid(text)
    }

    /// Integer parse. Numbers with a fractional part are truncated toward zero.
    pub fn parse_age(&self, value: Option<&Value>) -> FieldParse<i64> {
        match value {
            None | Some(Value::Null) => FieldParse::Missing,
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    FieldParse::Valid(i)
                } else if n.is_u64() {
                    FieldParse::Valid(i64::MAX)
                } else {
                    // Float-to-int `as` saturates at the i64 bounds.
                    match n.as_f64() {
                        Some(f) if f.is_finite() => FieldParse::Valid(f.trunc() as i64),
                        _ => FieldParse::Malformed,
                    }
                }
            }
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    FieldParse::Missing
                } else if self.age_sentinels.contains(trimmed) {
                    FieldParse::Malformed
                } else {
                    saturating_parse_i64(trimmed).map_or(FieldParse::Malformed, FieldParse::Valid)
                }
            }
            Some(Value::Bool(_) | Value::Array(_) | Value::Object(_)) => FieldParse::Malformed,
        }
    }

    /// Floating-point parse after the placeholder check. Non-finite values are rejected.
    pub fn parse_temperature(&self, value: Option<&Value>) -> FieldParse<f64> {
        let parsed = match value {
            None | Some(Value::Null) => return FieldParse::Missing,
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return FieldParse::Missing;
                }
                if self.temperature_sentinels.contains(trimmed) {
                    return FieldParse::Malformed;
                }
                trimmed.parse::<f64>().ok()
            }
            Some(Value::Bool(_) | Value::Array(_) | Value::Object(_)) => None,
        };

        match parsed {
            Some(t) if t.is_finite() => FieldParse::Valid(t),
            _ => FieldParse::Malformed,
        }
    }
}

/// Integer parse that clamps out-of-range digit strings to the i64 bounds
/// instead of rejecting them. Non-integer text still yields `None`.
pub fn saturating_parse_i64(text: &str) -> Option<i64> {
    match text.parse::<i64>() {
        Ok(value) => Some(value),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// Sanitize with the default sentinel vocabulary.
pub fn sanitize_patient(raw: &RawRecord) -> CanonicalPatient {
    Sanitizer::default().sanitize(raw)
}

fn field(raw: &RawRecord, vital: VitalField) -> Option<&Value> {
    raw.get(vital.as_str())
}

/// Trimmed string form of a scalar. Containers and booleans are never text vitals.
fn coerce_text(value: Option<&Value>) -> FieldParse<String> {
    let text = match value {
        None | Some(Value::Null) => return FieldParse::Missing,
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(_) | Value::Array(_) | Value::Object(_)) => return FieldParse::Malformed,
    };
    if text.is_empty() {
        FieldParse::Missing
    } else {
        FieldParse::Valid(text)
    }
}

/// Identifiers are opaque: keep the string form of whatever was sent.
fn coerce_patient_id(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING_PATIENT_ID.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("test record must be an object, got {other}"),
        }
    }

    fn bp(value: Value) -> Option<String> {
        Sanitizer::default()
            .parse_blood_pressure(Some(&value))
            .into_option()
    }

    fn age(value: Value) -> Option<i64> {
        Sanitizer::default().parse_age(Some(&value)).into_option()
    }

    fn temp(value: Value) -> Option<f64> {
        Sanitizer::default().parse_temperature(Some(&value)).into_option()
    }

    // ── Blood pressure ──────────────────────────────────────

    #[test]
    fn bp_well_formed_passes_through_trimmed() {
        assert_eq!(bp(json!("120/80")), Some("120/80".into()));
        assert_eq!(bp(json!("  145/95 ")), Some("145/95".into()));
    }

    #[test]
    fn bp_has_no_range_check_at_sanitize_stage() {
        assert_eq!(bp(json!("999/0")), Some("999/0".into()));
    }

    #[test]
    fn bp_placeholders_rejected_case_insensitively() {
        for token in ["N/A", "n/a", "NA", "INVALID", "Unknown", "INVALID_BP_FORMAT"] {
            assert_eq!(bp(json!(token)), None, "{token} should be rejected");
        }
    }

    #[test]
    fn bp_incomplete_or_non_numeric_rejected() {
        for text in ["150/", "/90", "abc/def", "120/8O", "120 / 80", "120/80/70", "12080"] {
            assert_eq!(bp(json!(text)), None, "{text} should be rejected");
        }
    }

    #[test]
    fn bp_missing_forms_are_missing() {
        let s = Sanitizer::default();
        assert_eq!(s.parse_blood_pressure(None), FieldParse::Missing);
        assert_eq!(s.parse_blood_pressure(Some(&Value::Null)), FieldParse::Missing);
        assert_eq!(s.parse_blood_pressure(Some(&json!("   "))), FieldParse::Missing);
    }

    #[test]
    fn bp_wrong_type_is_malformed() {
        let s = Sanitizer::default();
        assert_eq!(s.parse_blood_pressure(Some(&json!(120))), FieldParse::Malformed);
        assert_eq!(s.parse_blood_pressure(Some(&json!(true))), FieldParse::Malformed);
        assert_eq!(s.parse_blood_pressure(Some(&json!([120, 80]))), FieldParse::Malformed);
    }

    // ── Age ─────────────────────────────────────────────────

    #[test]
    fn age_accepts_integers_and_numeric_strings() {
        assert_eq!(age(json!(45)), Some(45));
        assert_eq!(age(json!("72")), Some(72));
        assert_eq!(age(json!(" 33 ")), Some(33));
    }

    #[test]
    fn age_truncates_fractional_numbers() {
        assert_eq!(age(json!(45.9)), Some(45));
    }

    #[test]
    fn age_is_not_clamped() {
        assert_eq!(age(json!(-5)), Some(-5));
        assert_eq!(age(json!(200)), Some(200));
    }

    #[test]
    fn oversized_age_saturates() {
        assert_eq!(age(json!(u64::MAX)), Some(i64::MAX));
        assert_eq!(age(json!(1e30)), Some(i64::MAX));
        assert_eq!(age(json!(-1e30)), Some(i64::MIN));
        assert_eq!(age(json!("99999999999999999999")), Some(i64::MAX));
        assert_eq!(age(json!("-99999999999999999999")), Some(i64::MIN));
    }

    #[test]
    fn saturating_parse_keeps_non_integers_out() {
        assert_eq!(saturating_parse_i64("120"), Some(120));
        assert_eq!(saturating_parse_i64("99999999999999999999"), Some(i64::MAX));
        assert_eq!(saturating_parse_i64("12.5"), None);
        assert_eq!(saturating_parse_i64(""), None);
    }

    #[test]
    fn age_non_numeric_rejected() {
        assert_eq!(age(json!("fifty-three")), None);
        assert_eq!(age(json!("unknown")), None);
        assert_eq!(age(json!("45.5")), None);
        assert_eq!(age(json!(true)), None);
        assert_eq!(age(json!("")), None);
        assert_eq!(age(json!({"years": 40})), None);
    }

    // ── Temperature ─────────────────────────────────────────

    #[test]
    fn temperature_accepts_numbers_and_numeric_strings() {
        assert_eq!(temp(json!(98.6)), Some(98.6));
        assert_eq!(temp(json!(101)), Some(101.0));
        assert_eq!(temp(json!(" 100.2 ")), Some(100.2));
    }

    #[test]
    fn temperature_placeholders_rejected() {
        for token in ["TEMP_ERROR", "temp_error", "INVALID", "UNKNOWN", "N/A", "na"] {
            assert_eq!(temp(json!(token)), None, "{token} should be rejected");
        }
    }

    #[test]
    fn temperature_garbage_and_non_finite_rejected() {
        assert_eq!(temp(json!("hot")), None);
        assert_eq!(temp(json!("NaN")), None);
        assert_eq!(temp(json!("inf")), None);
        assert_eq!(temp(json!(false)), None);
    }

    // ── Whole record ────────────────────────────────────────

    #[test]
    fn sanitize_builds_canonical_patient() {
        let record = raw(json!({
            "patient_id": "DEMO001",
            "name": "ignored",
            "age": "50",
            "blood_pressure": "135/79",
            "temperature": 99.6,
        }));
        let patient = sanitize_patient(&record);
        assert_eq!(
            patient,
            CanonicalPatient::new("DEMO001", Some(50), Some("135/79"), Some(99.6))
        );
    }

    #[test]
    fn sanitize_degrades_bad_fields_to_none() {
        let record = raw(json!({
            "patient_id": "DEMO002",
            "age": "unknown",
            "blood_pressure": "INVALID",
            "temperature": "TEMP_ERROR",
        }));
        let patient = sanitize_patient(&record);
        assert_eq!(patient, CanonicalPatient::new("DEMO002", None, None, None));
    }

    #[test]
    fn patient_id_coerced_to_string() {
        let numeric = sanitize_patient(&raw(json!({"patient_id": 42})));
        assert_eq!(numeric.patient_id, "42");

        let missing = sanitize_patient(&raw(json!({"age": 30})));
        assert_eq!(missing.patient_id, "None");
    }

    #[test]
    fn custom_sentinels_are_honoured() {
        let sanitizer = Sanitizer::default()
            .with_sentinels(VitalField::Age, SentinelSet::new(["INCONNU"]))
            .with_sentinels(
                VitalField::Temperature,
                SentinelSet::new(DEFAULT_TEMPERATURE_SENTINELS).with("ERREUR"),
            );
        assert_eq!(sanitizer.parse_age(Some(&json!("inconnu"))), FieldParse::Malformed);
        assert_eq!(
            sanitizer.parse_temperature(Some(&json!("erreur"))),
            FieldParse::Malformed
        );
        assert_eq!(sanitizer.sentinels(VitalField::Temperature).len(), 6);
    }

    #[test]
    fn emptied_sentinels_still_enforce_format() {
        let sanitizer =
            Sanitizer::default().with_sentinels(VitalField::BloodPressure, SentinelSet::empty());
        assert_eq!(
            sanitizer.parse_blood_pressure(Some(&json!("N/A"))),
            FieldParse::Malformed
        );
    }

    #[test]
    fn sanitize_all_preserves_order_and_duplicates() {
        let records = vec![
            raw(json!({"patient_id": "B"})),
            raw(json!({"patient_id": "A"})),
            raw(json!({"patient_id": "B"})),
        ];
        let ids: Vec<String> = Sanitizer::default()
            .sanitize_all(&records)
            .into_iter()
            .map(|p| p.patient_id)
            .collect();
        assert_eq!(ids, vec!["B", "A", "B"]);
    }

    fn arb_field() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            Just(json!("")),
            Just(json!("N/A")),
            Just(json!("TEMP_ERROR")),
            Just(json!("INVALID")),
            any::<i32>().prop_map(|n| json!(n)),
            (-50.0f64..150.0).prop_map(|f| json!(f)),
            "[0-9]{1,3}/[0-9]{1,3}".prop_map(|s| json!(s)),
            "[ 0-9a-zA-Z./_-]{0,10}".prop_map(|s| json!(s)),
            any::<bool>().prop_map(|b| json!(b)),
        ]
    }

    proptest! {
        /// Sanitizing an already-canonical record changes nothing.
        #[test]
        fn sanitize_is_idempotent(
            id in "[A-Z0-9]{1,8}",
            age in arb_field(),
            bp in arb_field(),
            temp in arb_field(),
        ) {
            let record = raw(json!({
                "patient_id": id,
                "age": age,
                "blood_pressure": bp,
                "temperature": temp,
            }));
            let once = sanitize_patient(&record);
            let twice = sanitize_patient(&once.to_raw());
            prop_assert_eq!(once, twice);
        }

        /// Any surviving blood pressure matches the digits/digits format.
        #[test]
        fn surviving_bp_is_well_formed(bp in arb_field()) {
            if let Some(text) = Sanitizer::default().parse_blood_pressure(Some(&bp)).into_option() {
                prop_assert!(BP_FORMAT.is_match(&text));
            }
        }
    }
}
