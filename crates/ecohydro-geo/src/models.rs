//! Bounding box value type

use ecohydro_core::error::{EcohydroError, Result};
use ecohydro_core::Crs;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Axis-aligned rectangle in some CRS.
///
/// `BoundingBox::new` enforces `min_x <= max_x` and `min_y <= max_y`. The
/// only way to obtain a box violating this is [`crate::bbox::buffer`],
/// whose antimeridian wrap can leave `min_x > max_x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    srs: Crs,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, srs: Crs) -> Result<Self> {
        if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            return Err(EcohydroError::InvalidBoundingBox {
                reason: "coordinates must be finite".to_string(),
            });
        }
        if min_x > max_x {
            return Err(EcohydroError::InvalidBoundingBox {
                reason: format!("min_x {} is greater than max_x {}", min_x, max_x),
            });
        }
        if min_y > max_y {
            return Err(EcohydroError::InvalidBoundingBox {
                reason: format!("min_y {} is greater than max_y {}", min_y, max_y),
            });
        }

        Ok(Self::from_edges(min_x, min_y, max_x, max_y, srs))
    }

    /// Box in WGS84 longitude/latitude degrees
    pub fn wgs84(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        Self::new(min_x, min_y, max_x, max_y, Crs::wgs84())
    }

    pub(crate) fn from_edges(min_x: f64, min_y: f64, max_x: f64, max_y: f64, srs: Crs) -> Self {
        Self { min_x, min_y, max_x, max_y, srs }
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn srs(&self) -> Crs {
        self.srs
    }

    pub fn is_wgs84(&self) -> bool {
        self.srs.is_wgs84()
    }

    /// Fail with `CrsMismatch` unless the box is in WGS84
    pub fn require_wgs84(&self) -> Result<()> {
        if self.is_wgs84() {
            Ok(())
        } else {
            Err(EcohydroError::CrsMismatch {
                expected: Crs::wgs84().to_string(),
                found: self.srs.to_string(),
            })
        }
    }

    /// Corners in ring order: SW, SE, NE, NW
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ]
    }

    /// Whitespace-separated `"minX minY maxX maxY"`
    pub fn to_wire_string(&self) -> String {
        format!("{} {} {} {}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.to_wire_string(), self.srs)
    }
}

/// Parses the wire form, which is always WGS84
impl FromStr for BoundingBox {
    type Err = EcohydroError;

    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split_whitespace()
            .map(|part| {
                part.parse::<f64>().map_err(|e| EcohydroError::InvalidBoundingBox {
                    reason: format!("'{}' is not a number: {}", part, e),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        match values.as_slice() {
            [min_x, min_y, max_x, max_y] => Self::wgs84(*min_x, *min_y, *max_x, *max_y),
            _ => Err(EcohydroError::InvalidBoundingBox {
                reason: format!("expected \"minX minY maxX maxY\", found {} values", values.len()),
            }),
        }
    }
}
