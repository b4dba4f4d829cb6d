use serde::{Deserialize, Serialize};

/// Vital-sign fields carried on an upstream patient record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalField {
    Age,
    BloodPressure,
    Temperature,
}

impl VitalField {
    pub const ALL: [VitalField; 3] = [
        VitalField::BloodPressure,
        VitalField::Age,
        VitalField::Temperature,
    ];

    /// Key used for this field in the upstream JSON payload.
    pub fn as_str(self) -> &'static str {
        match self {
            VitalField::Age => "age",
            VitalField::BloodPressure => "blood_pressure",
            VitalField::Temperature => "temperature",
        }
    }

    /// Unit shown next to this field in reports.
    pub fn default_unit(self) -> &'static str {
        match self {
            VitalField::Age => "years",
            VitalField::BloodPressure => "mmHg",
            VitalField::Temperature => "°F",
        }
    }
}

impl std::fmt::Display for VitalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
