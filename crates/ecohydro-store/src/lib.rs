//! Ecohydro Store - Vector and raster adapters over on-disk spatial data
//!
//! Shapefiles and GeoTIFFs are read in-process; reprojection, clipping and
//! format conversion run the GDAL/OGR command-line tools named in
//! configuration. Every operation that produces a file skips the work when
//! that file already exists.

pub mod gml;
pub mod lifecycle;
pub mod raster;
pub mod srs;
pub mod tools;
pub mod vector;

pub use raster::{GeoTransform, RasterDescriptor, ResampleMethod, ResampleOptions};
pub use srs::LayerSrs;
pub use tools::{ExternalTool, GdalTools, ToolOutput};
pub use vector::{AttributeFilter, UnionSeed};
