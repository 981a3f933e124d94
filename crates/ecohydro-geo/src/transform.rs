//! CRS transformation and UTM zone inference

use crate::bbox;
use crate::models::BoundingBox;
use ecohydro_core::error::{EcohydroError, Result};
use ecohydro_core::Crs;
use proj::Proj;
use std::fmt;

/// Latitude exactly on the equator is assigned to the southern hemisphere
pub const EQUATOR_IS_NORTHERN: bool = false;

const UTM_NORTH_BASE: u32 = 32600;
const UTM_SOUTH_BASE: u32 = 32700;

/// Reusable transformation between two CRS definitions.
///
/// Holds one PROJ context, so loops over many coordinates build it once.
/// Definitions may be `EPSG:n` codes or anything else PROJ accepts (WKT).
pub struct CrsTransformer {
    source: String,
    target: String,
    proj: Option<Proj>,
}

impl CrsTransformer {
    pub fn new(source: &Crs, target: &Crs) -> Result<Self> {
        if source == target {
            return Ok(Self::identity(source.definition()));
        }
        Self::from_definitions(&source.definition(), &target.definition())
    }

    pub fn from_definitions(source: &str, target: &str) -> Result<Self> {
        let proj = Proj::new_known_crs(source, target, None).map_err(|e| {
            EcohydroError::InvalidCrs {
                crs: format!("{} -> {}", abbreviate(source), abbreviate(target)),
                reason: format!("Failed to create projection: {}", e),
            }
        })?;

        Ok(Self {
            source: source.to_string(),
            target: target.to_string(),
            proj: Some(proj),
        })
    }

    fn identity(definition: String) -> Self {
        Self { source: definition.clone(), target: definition, proj: None }
    }

    pub fn is_identity(&self) -> bool {
        self.proj.is_none()
    }

    pub fn convert(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match &self.proj {
            None => Ok((x, y)),
            Some(proj) => proj.convert((x, y)).map_err(|e| EcohydroError::InvalidCrs {
                crs: format!("{} -> {}", abbreviate(&self.source), abbreviate(&self.target)),
                reason: format!("Projection of ({}, {}) failed: {}", x, y, e),
            }),
        }
    }
}

impl fmt::Debug for CrsTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrsTransformer")
            .field("source", &abbreviate(&self.source))
            .field("target", &abbreviate(&self.target))
            .finish()
    }
}

// WKT definitions can run to several kilobytes; keep messages readable.
fn abbreviate(definition: &str) -> String {
    const LIMIT: usize = 48;
    match definition.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &definition[..idx]),
        None => definition.to_string(),
    }
}

/// Project a single coordinate pair.
///
/// Builds fresh PROJ state on every call; use [`CrsTransformer`] for loops.
pub fn transform(x: f64, y: f64, source: &Crs, target: &Crs) -> Result<(f64, f64)> {
    CrsTransformer::new(source, target)?.convert(x, y)
}

/// A WGS84 UTM zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    pub zone: u32,
    pub is_north: bool,
}

impl UtmZone {
    pub fn crs(&self) -> Result<Crs> {
        epsg_for_utm_zone(self.zone, self.is_north)
    }
}

/// UTM zone containing a WGS84 coordinate.
///
/// The zone number is `(floor((lon + 180) / 6) + 1) mod 60`, with a
/// remainder of zero reported as zone 60. Longitude 180 therefore lands in
/// zone 1.
pub fn utm_zone_for(longitude: f64, latitude: f64) -> Result<UtmZone> {
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(EcohydroError::InvalidParameter {
            name: "longitude".to_string(),
            reason: format!("{} is outside [-180, 180]", longitude),
        });
    }
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(EcohydroError::InvalidParameter {
            name: "latitude".to_string(),
            reason: format!("{} is outside [-90, 90]", latitude),
        });
    }

    let zone = match ((((longitude + 180.0) / 6.0).floor() + 1.0) as i64).rem_euclid(60) {
        0 => 60,
        z => z as u32,
    };

    let is_north = if latitude == 0.0 { EQUATOR_IS_NORTHERN } else { latitude > 0.0 };

    Ok(UtmZone { zone, is_north })
}

/// EPSG code of a WGS84 UTM zone: 326xx north, 327xx south
pub fn epsg_for_utm_zone(zone: u32, is_north: bool) -> Result<Crs> {
    if !(1..=60).contains(&zone) {
        return Err(EcohydroError::InvalidParameter {
            name: "zone".to_string(),
            reason: format!("UTM zone {} is outside 1..=60", zone),
        });
    }

    let base = if is_north { UTM_NORTH_BASE } else { UTM_SOUTH_BASE };
    Crs::from_epsg(base + zone)
}

/// UTM CRS of the centre of a WGS84 box
pub fn utm_crs_for_bounding_box(bbox: &BoundingBox) -> Result<Crs> {
    bbox.require_wgs84()?;
    let (lon, lat) = bbox::center(bbox);
    utm_zone_for(lon, lat)?.crs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_zone_for_baltimore() {
        let zone = utm_zone_for(-76.7, 39.3).unwrap();
        assert_eq!(zone, UtmZone { zone: 18, is_north: true });
        assert_eq!(zone.crs().unwrap().to_string(), "EPSG:32618");
    }

    #[test]
    fn test_equator_is_southern() {
        let zone = utm_zone_for(10.0, 0.0).unwrap();
        assert_eq!(zone.is_north, EQUATOR_IS_NORTHERN);
        assert_eq!(zone.crs().unwrap().epsg(), 32732);
    }

    #[test]
    fn test_zone_edges() {
        assert_eq!(utm_zone_for(-180.0, 10.0).unwrap().zone, 1);
        assert_eq!(utm_zone_for(177.0, 10.0).unwrap().zone, 60);
        assert_eq!(utm_zone_for(180.0, 10.0).unwrap().zone, 1);
        assert_eq!(utm_zone_for(-174.0, 10.0).unwrap().zone, 2);
    }

    #[test]
    fn test_utm_zone_rejects_out_of_range() {
        assert!(utm_zone_for(181.0, 0.0).is_err());
        assert!(utm_zone_for(0.0, -91.0).is_err());
        assert!(utm_zone_for(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_epsg_for_utm_zone() {
        assert_eq!(epsg_for_utm_zone(1, true).unwrap().epsg(), 32601);
        assert_eq!(epsg_for_utm_zone(60, false).unwrap().epsg(), 32760);
        assert!(matches!(
            epsg_for_utm_zone(0, true),
            Err(EcohydroError::InvalidParameter { .. })
        ));
        assert!(epsg_for_utm_zone(61, false).is_err());
    }

    #[test]
    fn test_identity_transform_skips_proj() {
        let transformer = CrsTransformer::new(&Crs::wgs84(), &Crs::wgs84()).unwrap();
        assert!(transformer.is_identity());
        assert_eq!(transformer.convert(-76.7, 39.3).unwrap(), (-76.7, 39.3));
    }

    #[test]
    fn test_transform_to_utm() {
        let utm = Crs::from_epsg(32618).unwrap();
        let (x, y) = transform(-75.0, 0.0001, &Crs::wgs84(), &utm).unwrap();
        // -75 is the central meridian of zone 18
        assert!((x - 500_000.0).abs() < 1e-3);
        assert!(y > 0.0 && y < 20.0);
    }

    #[test]
    fn test_unknown_crs_is_invalid() {
        let bogus = Crs::from_epsg(999_999).unwrap();
        assert!(matches!(
            transform(0.0, 0.0, &Crs::wgs84(), &bogus),
            Err(EcohydroError::InvalidCrs { .. })
        ));
    }

    #[test]
    fn test_utm_crs_for_bounding_box() {
        let bbox: BoundingBox = "-76.769782 39.273610 -76.717498 39.326008".parse().unwrap();
        assert_eq!(utm_crs_for_bounding_box(&bbox).unwrap().epsg(), 32618);
    }

    #[test]
    fn test_abbreviate_long_definition() {
        let long = "x".repeat(200);
        assert_eq!(abbreviate(&long).len(), 51);
        assert_eq!(abbreviate("EPSG:4326"), "EPSG:4326");
    }
}
