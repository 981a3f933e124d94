use serde::{Deserialize, Serialize};

/// Linear unit of a projected CRS and its conversion factor to meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearUnit {
    pub name: String,
    pub meters_per_unit: f64,
}

impl LinearUnit {
    pub fn new(name: impl Into<String>, meters_per_unit: f64) -> Self {
        Self { name: name.into(), meters_per_unit }
    }

    pub fn metre() -> Self {
        Self::new("metre", 1.0)
    }

    pub fn foot() -> Self {
        Self::new("foot", 0.3048)
    }

    pub fn us_survey_foot() -> Self {
        Self::new("US survey foot", 0.3048006096012192)
    }

    /// Unit reported for geographic or undefined CRSes
    pub fn unknown() -> Self {
        Self::new("unknown", 1.0)
    }

    /// Resolve an EPSG unit-of-measure code (as stored in GeoTIFF keys)
    pub fn from_epsg_uom(code: u16) -> Option<Self> {
        match code {
            9001 => Some(Self::metre()),
            9002 => Some(Self::foot()),
            9003 => Some(Self::us_survey_foot()),
            9036 => Some(Self::new("kilometre", 1000.0)),
            _ => None,
        }
    }

    /// Resolve a PROJ `+units=` abbreviation
    pub fn from_proj_units(abbrev: &str) -> Option<Self> {
        match abbrev {
            "m" => Some(Self::metre()),
            "km" => Some(Self::new("kilometre", 1000.0)),
            "ft" => Some(Self::foot()),
            "us-ft" => Some(Self::us_survey_foot()),
            "yd" => Some(Self::new("yard", 0.9144)),
            "mi" => Some(Self::new("mile", 1609.344)),
            _ => None,
        }
    }

    pub fn to_meters(&self, value: f64) -> f64 {
        value * self.meters_per_unit
    }
}
