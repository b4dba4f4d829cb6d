use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::vital_sign::VitalField;

/// One patient record exactly as the upstream API delivered it.
/// Field values are arbitrary JSON; nothing is trusted until sanitized.
pub type RawRecord = Map<String, Value>;

/// Key of the opaque patient identifier in a raw record.
pub const PATIENT_ID_KEY: &str = "patient_id";

/// Outcome of parsing a single raw field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldParse<T> {
    Valid(T),
    /// Key absent, JSON null, or an empty string.
    Missing,
    /// Present but unusable: wrong type, bad format, or a placeholder sentinel.
    Malformed,
}

impl<T> FieldParse<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            FieldParse::Valid(v) => Some(v),
            FieldParse::Missing | FieldParse::Malformed => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, FieldParse::Valid(_))
    }
}

/// A patient record after sanitization.
///
/// Every vital is either a value that passed format validation or `None`.
/// Records are built once during ingestion and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPatient {
    pub patient_id: String,
    pub age: Option<i64>,
    /// `"systolic/diastolic"`, digits only on both sides.
    pub blood_pressure: Option<String>,
    /// Degrees Fahrenheit.
    pub temperature: Option<f64>,
}

impl CanonicalPatient {
    pub fn new(
        patient_id: impl Into<String>,
        age: Option<i64>,
        blood_pressure: Option<&str>,
        temperature: Option<f64>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            age,
            blood_pressure: blood_pressure.map(str::to_string),
            temperature,
        }
    }

    /// Render back into the upstream shape. Absent vitals become JSON null.
    pub fn to_raw(&self) -> RawRecord {
        let mut raw = Map::new();
        raw.insert(PATIENT_ID_KEY.into(), Value::String(self.patient_id.clone()));
        raw.insert(
            VitalField::Age.as_str().into(),
            self.age.map_or(Value::Null, Value::from),
        );
        raw.insert(
            VitalField::BloodPressure.as_str().into(),
            self.blood_pressure
                .as_ref()
                .map_or(Value::Null, |bp| Value::String(bp.clone())),
        );
        raw.insert(
            VitalField::Temperature.as_str().into(),
            self.temperature
                .and_then(serde_json::Number::from_f64)
                .map_or(Value::Null, Value::Number),
        );
        raw
    }

    /// Whether the given vital survived sanitization.
    pub fn has_field(&self, field: VitalField) -> bool {
        match field {
            VitalField::Age => self.age.is_some(),
            VitalField::BloodPressure => self.blood_pressure.is_some(),
            VitalField::Temperature => self.temperature.is_some(),
        }
    }

    /// Sanitized value of a vital as JSON, for reports.
    pub fn field_value(&self, field: VitalField) -> Value {
        let raw = self.to_raw();
        raw.get(field.as_str()).cloned().unwrap_or(Value::Null)
    }
}
