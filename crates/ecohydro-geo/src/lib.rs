//! Ecohydro Geo - Bounding boxes, CRS transforms, and geodesic operations
//!
//! Pure coordinate and bounding-box math shared by the vector and raster
//! adapters. Nothing in this crate touches the filesystem.

pub mod bbox;
pub mod models;
pub mod transform;

pub use models::BoundingBox;
pub use transform::{
    epsg_for_utm_zone, transform, utm_crs_for_bounding_box, utm_zone_for, CrsTransformer,
    UtmZone, EQUATOR_IS_NORTHERN,
};
