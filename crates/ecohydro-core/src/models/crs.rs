//! Coordinate Reference System identifiers.
//!
//! Every CRS-bearing parameter and stored metadata field uses the exact
//! ASCII form `EPSG:<integer>`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EcohydroError, Result};

const EPSG_PREFIX: &str = "EPSG:";

/// EPSG code of WGS 84 geographic coordinates
pub const WGS84_EPSG: u32 = 4326;

/// Coordinate Reference System identified by EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs {
    epsg: u32,
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Crs {
    /// Create a CRS from an EPSG code; zero is rejected
    pub fn from_epsg(epsg: u32) -> Result<Self> {
        if epsg == 0 {
            return Err(EcohydroError::InvalidCrs {
                crs: format!("{}{}", EPSG_PREFIX, epsg),
                reason: "EPSG code must be a positive integer".to_string(),
            });
        }
        Ok(Self { epsg })
    }

    /// WGS 84 (EPSG:4326)
    pub const fn wgs84() -> Self {
        Self { epsg: WGS84_EPSG }
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    pub fn is_wgs84(&self) -> bool {
        self.epsg == WGS84_EPSG
    }

    /// Definition string understood by PROJ
    pub fn definition(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", EPSG_PREFIX, self.epsg)
    }
}

impl FromStr for Crs {
    type Err = EcohydroError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.strip_prefix(EPSG_PREFIX).ok_or_else(|| EcohydroError::InvalidCrs {
            crs: s.to_string(),
            reason: "expected the form EPSG:<integer>".to_string(),
        })?;

        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(EcohydroError::InvalidCrs {
                crs: s.to_string(),
                reason: "EPSG code must be an unsigned integer".to_string(),
            });
        }

        let epsg = code.parse::<u32>().map_err(|e| EcohydroError::InvalidCrs {
            crs: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::from_epsg(epsg)
    }
}

impl TryFrom<String> for Crs {
    type Error = EcohydroError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_epsg() {
        let crs: Crs = "EPSG:26918".parse().unwrap();
        assert_eq!(crs.epsg(), 26918);
        assert_eq!(crs.to_string(), "EPSG:26918");
    }

    #[test]
    fn test_wgs84() {
        let crs: Crs = "EPSG:4326".parse().unwrap();
        assert!(crs.is_wgs84());
        assert_eq!(crs, Crs::wgs84());
        assert_eq!(Crs::default(), Crs::wgs84());
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["epsg:4326", "EPSG:", "EPSG:-1", "EPSG: 4326", "4326", "EPSG:0", "EPSG:43a6"] {
            let err = bad.parse::<Crs>().unwrap_err();
            assert!(matches!(err, EcohydroError::InvalidCrs { .. }), "{} should be rejected", bad);
        }
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(code in 1u32..=999_999) {
            let crs = Crs::from_epsg(code).unwrap();
            prop_assert_eq!(crs.to_string().parse::<Crs>().unwrap(), crs);
        }
    }

    #[test]
    fn test_serde_string_form() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            srs: Crs,
        }

        let holder: Holder = toml::from_str(r#"srs = "EPSG:32618""#).unwrap();
        assert_eq!(holder.srs.epsg(), 32618);

        let text = toml::to_string(&holder).unwrap();
        assert!(text.contains("EPSG:32618"));
    }
}
