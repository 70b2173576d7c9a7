use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionReference {
    pub name: String,
    pub reference_mm: f64,
}

impl DimensionReference {
    pub fn new(name: impl Into<String>, reference_mm: f64) -> Self {
        Self {
            name: name.into(),
            reference_mm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementProfile {
    pub references: Vec<DimensionReference>,
    pub profile_name: String,
    pub units: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionMeasurement {
    pub name: String,
    pub reference_mm: f64,
    pub measured_mm: f64,
    pub absolute_error_mm: f64,
}

impl DimensionMeasurement {
    pub fn is_within_tolerance(&self, tolerance_mm: f64) -> bool {
        self.absolute_error_mm <= tolerance_mm
    }
}

/// Dimensional validation outcome over a measurement profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub session_id: String,
    pub generated_at_ms: u64,
    pub tolerance_mm: f64,
    pub measurements: Vec<DimensionMeasurement>,
    pub max_absolute_error_mm: f64,
    pub mean_absolute_error_mm: f64,
    pub pass: bool,
    pub summary: String,
}
