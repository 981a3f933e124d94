//! Bounding box engine: containment, centre, geodesic area, buffering and tiling

use crate::models::BoundingBox;
use ecohydro_core::error::{EcohydroError, Result};
use ecohydro_core::Crs;
use geo::{Destination, Geodesic, GeodesicArea, LineString, Point, Polygon};

const NORTH: f64 = 0.0;
const EAST: f64 = 90.0;

/// Whether a WGS84 coordinate lies inside the box, edges included
pub fn contains(bbox: &BoundingBox, lon: f64, lat: f64) -> Result<bool> {
    bbox.require_wgs84()?;
    Ok(lon >= bbox.min_x() && lon <= bbox.max_x() && lat >= bbox.min_y() && lat <= bbox.max_y())
}

pub fn center(bbox: &BoundingBox) -> (f64, f64) {
    (
        bbox.min_x() + (bbox.max_x() - bbox.min_x()) / 2.0,
        bbox.min_y() + (bbox.max_y() - bbox.min_y()) / 2.0,
    )
}

/// Geodesic area on the WGS84 ellipsoid of the ring SW, SE, NE, NW
pub fn area_sq_meters(bbox: &BoundingBox) -> Result<f64> {
    bbox.require_wgs84()?;
    let mut ring: Vec<(f64, f64)> = bbox.corners().to_vec();
    ring.push(ring[0]);
    let polygon = Polygon::new(LineString::from(ring), vec![]);
    Ok(polygon.geodesic_area_unsigned())
}

/// Expand every edge by `degrees`.
///
/// Longitudes past the antimeridian wrap around, so the result may have
/// `min_x > max_x`. The lower latitude clamp tests `min_y` and so does the
/// upper one, which means `max_y` is only clamped to 90 once `min_y` has
/// itself passed 90.
pub fn buffer(bbox: &BoundingBox, degrees: f64) -> Result<BoundingBox> {
    if !degrees.is_finite() || degrees < 0.0 {
        return Err(EcohydroError::InvalidParameter {
            name: "buffer".to_string(),
            reason: format!("{} is not a non-negative number of degrees", degrees),
        });
    }
    if degrees == 0.0 {
        return Ok(*bbox);
    }

    let mut min_x = bbox.min_x() - degrees;
    let mut min_y = bbox.min_y() - degrees;
    let mut max_x = bbox.max_x() + degrees;
    let mut max_y = bbox.max_y() + degrees;

    if min_x < -180.0 {
        min_x += 360.0;
    }
    if min_y < -90.0 {
        min_y = -90.0;
    }
    if max_x > 180.0 {
        max_x -= 360.0;
    }
    if min_y > 90.0 {
        max_y = 90.0;
    }

    Ok(BoundingBox::from_edges(min_x, min_y, max_x, max_y, bbox.srs()))
}

/// Partition a WGS84 box into tiles no larger than `threshold_sq_meters`.
///
/// Tiles are squares of side `sqrt(threshold)` metres laid out from the
/// south-west corner, stepping north for each row and east within a row.
/// The last row and column overshoot the northern and eastern edges.
pub fn tile(bbox: &BoundingBox, threshold_sq_meters: f64) -> Result<Vec<BoundingBox>> {
    if !threshold_sq_meters.is_finite() || threshold_sq_meters <= 0.0 {
        return Err(EcohydroError::InvalidParameter {
            name: "threshold".to_string(),
            reason: format!("{} must be a positive area", threshold_sq_meters),
        });
    }

    let area = area_sq_meters(bbox)?;
    if area <= threshold_sq_meters {
        return Ok(vec![*bbox]);
    }

    let side = threshold_sq_meters.sqrt();
    let mut tiles = Vec::new();

    let mut row_min_y = bbox.min_y();
    while row_min_y < bbox.max_y() {
        let row_max_y = Geodesic.destination(Point::new(bbox.min_x(), row_min_y), NORTH, side).y();
        if row_max_y <= row_min_y {
            return Err(EcohydroError::InvalidBoundingBox {
                reason: format!("tiling cannot advance north past latitude {}", row_min_y),
            });
        }

        let mut col_min_x = bbox.min_x();
        while col_min_x < bbox.max_x() {
            let col_max_x = Geodesic.destination(Point::new(col_min_x, row_max_y), EAST, side).x();
            if col_max_x <= col_min_x {
                return Err(EcohydroError::InvalidBoundingBox {
                    reason: format!("tiling cannot advance east past longitude {}", col_min_x),
                });
            }

            tiles.push(BoundingBox::from_edges(
                col_min_x,
                row_min_y,
                col_max_x,
                row_max_y,
                Crs::wgs84(),
            ));
            col_min_x = col_max_x;
        }

        row_min_y = row_max_y;
    }

    tracing::debug!("Tiled {} into {} tiles of side {:.1} m", bbox, tiles.len(), side);
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study_area() -> BoundingBox {
        BoundingBox::wgs84(-76.8, 39.2, -76.6, 39.4).unwrap()
    }

    #[test]
    fn test_contains_inclusive_edges() {
        let bbox = study_area();
        assert!(contains(&bbox, -76.8, 39.2).unwrap());
        assert!(contains(&bbox, -76.6, 39.4).unwrap());
        assert!(contains(&bbox, -76.7, 39.3).unwrap());
        assert!(!contains(&bbox, -76.59, 39.3).unwrap());
        assert!(!contains(&bbox, -76.7, 39.41).unwrap());
    }

    #[test]
    fn test_contains_requires_wgs84() {
        let utm = BoundingBox::new(0.0, 0.0, 1.0, 1.0, Crs::from_epsg(26918).unwrap()).unwrap();
        assert!(matches!(contains(&utm, 0.5, 0.5), Err(EcohydroError::CrsMismatch { .. })));
        assert!(area_sq_meters(&utm).is_err());
    }

    #[test]
    fn test_center() {
        let (lon, lat) = center(&study_area());
        assert!((lon + 76.7).abs() < 1e-9);
        assert!((lat - 39.3).abs() < 1e-9);
    }

    #[test]
    fn test_area_two_degree_cell_at_equator() {
        let bbox = BoundingBox::wgs84(-1.0, -1.0, 1.0, 1.0).unwrap();
        let area = area_sq_meters(&bbox).unwrap();
        assert!(area > 4.8e10 && area < 5.0e10, "area was {}", area);
    }

    #[test]
    fn test_buffer_expands_edges() {
        let buffered = buffer(&study_area(), 0.1).unwrap();
        assert!((buffered.min_x() + 76.9).abs() < 1e-9);
        assert!((buffered.min_y() - 39.1).abs() < 1e-9);
        assert!((buffered.max_x() + 76.5).abs() < 1e-9);
        assert!((buffered.max_y() - 39.5).abs() < 1e-9);
        assert_eq!(buffered.srs(), Crs::wgs84());
    }

    #[test]
    fn test_buffer_wraps_longitude() {
        let bbox = BoundingBox::wgs84(-179.5, 0.0, 179.5, 1.0).unwrap();
        let buffered = buffer(&bbox, 1.0).unwrap();
        assert!((buffered.min_x() - 179.5).abs() < 1e-9);
        assert!((buffered.max_x() + 179.5).abs() < 1e-9);
        assert!(buffered.min_x() > buffered.max_x());
    }

    #[test]
    fn test_buffer_latitude_clamp_asymmetry() {
        let bbox = BoundingBox::wgs84(0.0, -89.5, 1.0, 89.5).unwrap();
        let buffered = buffer(&bbox, 1.0).unwrap();
        assert_eq!(buffered.min_y(), -90.0);
        // max_y is left past the pole because min_y did not exceed 90
        assert!((buffered.max_y() - 90.5).abs() < 1e-9);
    }

    #[test]
    fn test_buffer_rejects_negative() {
        assert!(matches!(
            buffer(&study_area(), -0.5),
            Err(EcohydroError::InvalidParameter { .. })
        ));
        assert!(buffer(&study_area(), f64::INFINITY).is_err());
    }

    #[test]
    fn test_tile_grid() {
        let bbox = study_area();
        let tiles = tile(&bbox, 1.0e8).unwrap();

        // ~17 km wide and ~22 km tall in 10 km squares
        assert_eq!(tiles.len(), 6);
        assert_eq!(tiles[0].min_x(), bbox.min_x());
        assert_eq!(tiles[0].min_y(), bbox.min_y());
        assert!(tiles.iter().all(|t| t.is_wgs84()));

        let last = tiles.last().unwrap();
        assert!(last.max_x() >= bbox.max_x());
        assert!(last.max_y() >= bbox.max_y());

        for t in &tiles {
            let area = area_sq_meters(t).unwrap();
            assert!((area - 1.0e8).abs() / 1.0e8 < 0.01, "tile area {}", area);
        }
    }

    #[test]
    fn test_tile_rejects_non_positive_threshold() {
        assert!(matches!(tile(&study_area(), 0.0), Err(EcohydroError::InvalidParameter { .. })));
        assert!(tile(&study_area(), -1.0).is_err());
    }
}
