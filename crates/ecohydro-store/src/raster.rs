//! GeoTIFF adapter
//!
//! Metadata is read straight from the GeoTIFF tags on every call. Clipping,
//! resampling and format copies are delegated to `gdalwarp` and
//! `gdal_translate`; each of those operations does nothing when its output
//! file already exists.

use ecohydro_core::error::{EcohydroError, Result};
use ecohydro_core::{Crs, LinearUnit};
use ecohydro_geo::{BoundingBox, CrsTransformer};
use serde::Serialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tiff::decoder::Decoder;
use tiff::tags::Tag;

use crate::lifecycle::{self, GEOTIFF_SIDECARS};
use crate::srs;
use crate::tools::GdalTools;

// GeoTIFF tags
const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const MODEL_TRANSFORMATION_TAG: u16 = 34264;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;

// GeoKeys
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;
const PROJ_LINEAR_UNITS_GEO_KEY: u16 = 3076;

const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

const GTIFF_CREATION: [&str; 4] = ["-of", "GTiff", "-co", "COMPRESS=LZW"];

/// Affine transform from pixel/line to georeferenced coordinates, in GDAL
/// coefficient order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// North-up transform with the upper-left corner at `(origin_x, origin_y)`
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self([origin_x, pixel_width, 0.0, origin_y, 0.0, -pixel_height])
    }

    pub fn apply(&self, column: f64, row: f64) -> (f64, f64) {
        let g = &self.0;
        (g[0] + column * g[1] + row * g[2], g[3] + column * g[4] + row * g[5])
    }

    pub fn origin_x(&self) -> f64 {
        self.0[0]
    }

    pub fn origin_y(&self) -> f64 {
        self.0[3]
    }

    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    /// Pixel height as a positive number for north-up rasters
    pub fn pixel_height(&self) -> f64 {
        -self.0[5]
    }

    fn shifted_half_pixel(&self) -> Self {
        let g = self.0;
        Self([
            g[0] - 0.5 * g[1] - 0.5 * g[2],
            g[1],
            g[2],
            g[3] - 0.5 * g[4] - 0.5 * g[5],
            g[4],
            g[5],
        ])
    }
}

/// Metadata of a raster file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterDescriptor {
    pub columns: u32,
    pub rows: u32,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub linear_unit: LinearUnit,
    pub crs: Crs,
    /// PROJ definition of `crs`, when PROJ can express it as a PROJ string
    pub crs_definition: Option<String>,
    pub geo_transform: GeoTransform,
}

impl RasterDescriptor {
    /// Georeferenced `(xmin, ymin, xmax, ymax)` of the pixel grid
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let (res_x, res_y) = self.resolution();
        let xmin = self.geo_transform.origin_x();
        let ymax = self.geo_transform.origin_y();
        let xmax = xmin + res_x * self.columns as f64;
        let ymin = ymax - res_y * self.rows as f64;
        (xmin, ymin, xmax, ymax)
    }

    /// Unsigned pixel size, whatever the axis orientation of the transform
    pub fn resolution(&self) -> (f64, f64) {
        (self.pixel_width.abs(), self.pixel_height.abs())
    }
}

/// Resampling kernels understood by `gdalwarp -r`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResampleMethod {
    Near,
    #[default]
    Bilinear,
    Cubic,
    CubicSpline,
    Lanczos,
    Average,
    Mode,
}

impl ResampleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResampleMethod::Near => "near",
            ResampleMethod::Bilinear => "bilinear",
            ResampleMethod::Cubic => "cubic",
            ResampleMethod::CubicSpline => "cubicspline",
            ResampleMethod::Lanczos => "lanczos",
            ResampleMethod::Average => "average",
            ResampleMethod::Mode => "mode",
        }
    }
}

impl fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResampleMethod {
    type Err = EcohydroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "near" | "nearest" => Ok(ResampleMethod::Near),
            "bilinear" => Ok(ResampleMethod::Bilinear),
            "cubic" => Ok(ResampleMethod::Cubic),
            "cubicspline" | "cubic-spline" => Ok(ResampleMethod::CubicSpline),
            "lanczos" => Ok(ResampleMethod::Lanczos),
            "average" => Ok(ResampleMethod::Average),
            "mode" => Ok(ResampleMethod::Mode),
            _ => Err(EcohydroError::InvalidParameter {
                name: "resample_method".to_string(),
                reason: format!(
                    "'{}' is not one of near, bilinear, cubic, cubicspline, lanczos, average, mode",
                    s
                ),
            }),
        }
    }
}

/// Target grid of [`resample`]
#[derive(Debug, Clone, PartialEq)]
pub struct ResampleOptions {
    /// Overrides the CRS embedded in the input raster
    pub source_crs: Option<Crs>,
    pub target_crs: Crs,
    pub res_x: f64,
    pub res_y: f64,
    pub method: ResampleMethod,
}

impl ResampleOptions {
    pub fn new(target_crs: Crs, res_x: f64, res_y: f64) -> Self {
        Self { source_crs: None, target_crs, res_x, res_y, method: ResampleMethod::default() }
    }

    pub fn with_source_crs(mut self, source_crs: Crs) -> Self {
        self.source_crs = Some(source_crs);
        self
    }

    pub fn with_method(mut self, method: ResampleMethod) -> Self {
        self.method = method;
        self
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("res_x", self.res_x), ("res_y", self.res_y)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(EcohydroError::InvalidParameter {
                    name: name.to_string(),
                    reason: format!("resolution must be a positive number, got {}", value),
                });
            }
        }
        Ok(())
    }
}

fn unreadable(path: &Path, reason: impl fmt::Display) -> EcohydroError {
    EcohydroError::Unreadable { path: path.to_path_buf(), reason: reason.to_string() }
}

fn read_geo_keys<R>(decoder: &mut Decoder<R>) -> Option<HashMap<u16, u16>>
where
    R: std::io::Read + std::io::Seek,
{
    let directory = decoder.get_tag_u16_vec(Tag::Unknown(GEO_KEY_DIRECTORY_TAG)).ok()?;
    if directory.len() < 4 {
        return None;
    }

    // Header: version, revision, minor revision, key count; then 4 shorts per key.
    // Only keys stored inline (location 0) carry a SHORT value.
    let count = directory[3] as usize;
    let keys = directory[4..]
        .chunks_exact(4)
        .take(count)
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect();
    Some(keys)
}

fn read_geo_transform<R>(decoder: &mut Decoder<R>) -> Option<GeoTransform>
where
    R: std::io::Read + std::io::Seek,
{
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TRANSFORMATION_TAG)) {
        if m.len() >= 8 {
            return Some(GeoTransform([m[3], m[0], m[1], m[7], m[4], m[5]]));
        }
    }

    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT_TAG)).ok()?;
    let scale = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE_TAG)).ok()?;
    if tiepoint.len() < 6 || scale.len() < 2 {
        return None;
    }

    // Tiepoint [i, j, k, x, y, z] ties pixel (i, j) to (x, y)
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    Some(GeoTransform::north_up(x - i * scale[0], y + j * scale[1], scale[0], scale[1]))
}

fn crs_from_geo_keys(keys: &HashMap<u16, u16>) -> Option<(Crs, bool)> {
    let geographic_model = keys.get(&GT_MODEL_TYPE_GEO_KEY) == Some(&MODEL_TYPE_GEOGRAPHIC);

    let projected = keys
        .get(&PROJECTED_CS_TYPE_GEO_KEY)
        .filter(|code| !geographic_model && **code != USER_DEFINED);
    if let Some(code) = projected {
        return Crs::from_epsg(*code as u32).ok().map(|crs| (crs, true));
    }

    keys.get(&GEOGRAPHIC_TYPE_GEO_KEY)
        .filter(|code| **code != USER_DEFINED)
        .and_then(|code| Crs::from_epsg(*code as u32).ok())
        .map(|crs| (crs, false))
}

/// Read the dimensions, georeferencing and CRS of a GeoTIFF
pub fn describe(path: &Path) -> Result<RasterDescriptor> {
    lifecycle::ensure_readable_file(path)?;
    let file = File::open(path).map_err(|e| unreadable(path, e))?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(|e| unreadable(path, e))?;

    let (columns, rows) = decoder.dimensions().map_err(|e| unreadable(path, e))?;
    let keys = read_geo_keys(&mut decoder)
        .ok_or_else(|| unreadable(path, "not a GeoTIFF: no GeoKey directory"))?;
    let mut geo_transform = read_geo_transform(&mut decoder)
        .ok_or_else(|| unreadable(path, "no georeferencing tags"))?;

    if keys.get(&GT_RASTER_TYPE_GEO_KEY) == Some(&RASTER_PIXEL_IS_POINT) {
        geo_transform = geo_transform.shifted_half_pixel();
    }

    let (crs, projected) = crs_from_geo_keys(&keys)
        .ok_or_else(|| unreadable(path, "no EPSG coordinate reference system in GeoKeys"))?;
    let crs_definition = srs::proj_definition(&crs);

    let linear_unit = if !projected {
        LinearUnit::unknown()
    } else {
        keys.get(&PROJ_LINEAR_UNITS_GEO_KEY)
            .and_then(|code| LinearUnit::from_epsg_uom(*code))
            .or_else(|| {
                crs_definition.as_deref().map(srs::linear_unit_from_proj_definition)
            })
            .unwrap_or_else(LinearUnit::unknown)
    };

    Ok(RasterDescriptor {
        columns,
        rows,
        pixel_width: geo_transform.pixel_width(),
        pixel_height: geo_transform.pixel_height(),
        linear_unit,
        crs,
        crs_definition,
        geo_transform,
    })
}

/// `(columns, rows)` of a raster
pub fn dimensions(path: &Path) -> Result<(u32, u32)> {
    let descriptor = describe(path)?;
    Ok((descriptor.columns, descriptor.rows))
}

/// WGS84 box enclosing the four corner pixels of a raster
pub fn bounding_box_of(path: &Path) -> Result<BoundingBox> {
    let descriptor = describe(path)?;
    let transformer = CrsTransformer::new(&descriptor.crs, &Crs::wgs84())?;

    let (cols, rows) = (descriptor.columns as f64, descriptor.rows as f64);
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for (column, row) in [(0.0, 0.0), (cols, 0.0), (cols, rows), (0.0, rows)] {
        let (x, y) = descriptor.geo_transform.apply(column, row);
        let (lon, lat) = transformer.convert(x, y)?;
        min_x = min_x.min(lon);
        min_y = min_y.min(lat);
        max_x = max_x.max(lon);
        max_y = max_y.max(lat);
    }

    BoundingBox::wgs84(min_x, min_y, max_x, max_y)
}

fn number(value: f64) -> OsString {
    value.to_string().into()
}

fn creation_options() -> impl Iterator<Item = OsString> {
    GTIFF_CREATION.into_iter().map(OsString::from)
}

/// Prepare an output path; `None` when the output already exists
fn pending_output(output_dir: &Path, output_name: &str) -> Result<Option<PathBuf>> {
    let output = lifecycle::ensure_writable_dir(output_dir)?.join(output_name);
    if lifecycle::exists_idempotent(&output) {
        Ok(None)
    } else {
        Ok(Some(output))
    }
}

/// Cut the window covering a WGS84 box out of `<output_dir>/<input_name>`
pub fn clip_by_bounding_box(
    tools: &GdalTools,
    output_dir: &Path,
    input_name: &str,
    output_name: &str,
    bbox: &BoundingBox,
) -> Result<PathBuf> {
    bbox.require_wgs84()?;
    let Some(output) = pending_output(output_dir, output_name)? else {
        return Ok(output_dir.join(output_name));
    };

    let input = output_dir.join(input_name);
    let descriptor = describe(&input)?;
    let transformer = CrsTransformer::new(&Crs::wgs84(), &descriptor.crs)?;
    let (ulx, uly) = transformer.convert(bbox.min_x(), bbox.max_y())?;
    let (lrx, lry) = transformer.convert(bbox.max_x(), bbox.min_y())?;

    let mut args: Vec<OsString> = vec!["-q".into(), "-stats".into()];
    args.extend(creation_options());
    args.push(OsString::from("-projwin"));
    args.extend([number(ulx), number(uly), number(lrx), number(lry)]);
    args.extend([input.into_os_string(), output.clone().into_os_string()]);

    tools.gdal_translate()?.run(&args)?;
    tracing::info!("Clipped {} to {}", input_name, output.display());
    Ok(output)
}

/// Warp `input_raster` onto the grid (extent, resolution and CRS) of `extent_raster`
pub fn clip_by_reference_extent(
    tools: &GdalTools,
    output_dir: &Path,
    extent_raster: &Path,
    input_raster: &Path,
    output_name: &str,
    method: ResampleMethod,
) -> Result<PathBuf> {
    let Some(output) = pending_output(output_dir, output_name)? else {
        return Ok(output_dir.join(output_name));
    };

    let extent = describe(extent_raster)?;
    let source = describe(input_raster)?;
    let (xmin, ymin, xmax, ymax) = extent.extent();

    let mut args: Vec<OsString> = vec![
        "-s_srs".into(),
        source.crs.to_string().into(),
        "-t_srs".into(),
        extent.crs.to_string().into(),
        "-te".into(),
    ];
    args.extend([number(xmin), number(ymin), number(xmax), number(ymax)]);
    let (res_x, res_y) = extent.resolution();
    args.extend([OsString::from("-tr"), number(res_x), number(res_y)]);
    args.extend([OsString::from("-r"), OsString::from(method.as_str())]);
    args.extend([input_raster.as_os_str().to_owned(), output.clone().into_os_string()]);

    tools.gdal_warp()?.run(&args)?;
    tracing::info!("Warped {} onto the grid of {}", input_raster.display(), extent_raster.display());
    Ok(output)
}

/// Reproject and resample a raster to a new CRS and resolution
pub fn resample(
    tools: &GdalTools,
    output_dir: &Path,
    input_raster: &Path,
    output_name: &str,
    options: &ResampleOptions,
) -> Result<PathBuf> {
    options.validate()?;
    let Some(output) = pending_output(output_dir, output_name)? else {
        return Ok(output_dir.join(output_name));
    };
    lifecycle::ensure_readable_file(input_raster)?;

    let mut args: Vec<OsString> = vec!["-q".into()];
    if let Some(source) = &options.source_crs {
        args.extend([OsString::from("-s_srs"), OsString::from(source.to_string())]);
    }
    args.extend([OsString::from("-t_srs"), OsString::from(options.target_crs.to_string())]);
    args.extend([OsString::from("-tr"), number(options.res_x), number(options.res_y)]);
    args.extend([OsString::from("-r"), OsString::from(options.method.as_str())]);
    args.extend(creation_options());
    args.extend([input_raster.as_os_str().to_owned(), output.clone().into_os_string()]);

    tools.gdal_warp()?.run(&args)?;
    tracing::info!(
        "Resampled {} to {} at {} x {}",
        input_raster.display(),
        options.target_crs,
        options.res_x,
        options.res_y
    );
    Ok(output)
}

/// Copy a raster into an LZW-compressed GeoTIFF without changing its CRS
pub fn copy_to_geotiff(
    tools: &GdalTools,
    output_dir: &Path,
    input_raster: &Path,
    output_name: &str,
) -> Result<PathBuf> {
    let Some(output) = pending_output(output_dir, output_name)? else {
        return Ok(output_dir.join(output_name));
    };
    lifecycle::ensure_readable_file(input_raster)?;

    let mut args: Vec<OsString> = vec!["-q".into()];
    args.extend(creation_options());
    args.extend([input_raster.as_os_str().to_owned(), output.clone().into_os_string()]);

    tools.gdal_translate()?.run(&args)?;
    tracing::info!("Copied {} to {}", input_raster.display(), output.display());
    Ok(output)
}

/// Remove a GeoTIFF and its `.aux.xml` statistics sidecar
pub fn delete_geotiff(path: &Path) -> Result<()> {
    lifecycle::delete_artifact_group(path, GEOTIFF_SIDECARS)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_method_parsing() {
        assert_eq!("nearest".parse::<ResampleMethod>().unwrap(), ResampleMethod::Near);
        assert_eq!("cubic-spline".parse::<ResampleMethod>().unwrap(), ResampleMethod::CubicSpline);
        assert_eq!("Lanczos".parse::<ResampleMethod>().unwrap(), ResampleMethod::Lanczos);
        assert_eq!(ResampleMethod::default(), ResampleMethod::Bilinear);
        assert!(matches!(
            "sinc".parse::<ResampleMethod>(),
            Err(EcohydroError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_geo_transform_apply() {
        let gt = GeoTransform::north_up(350_000.0, 4_350_000.0, 30.0, 30.0);
        assert_eq!(gt.apply(0.0, 0.0), (350_000.0, 4_350_000.0));
        assert_eq!(gt.apply(10.0, 20.0), (350_300.0, 4_349_400.0));
        assert_eq!(gt.pixel_height(), 30.0);
    }

    #[test]
    fn test_pixel_is_point_shift() {
        let gt = GeoTransform::north_up(100.0, 200.0, 10.0, 10.0).shifted_half_pixel();
        assert_eq!(gt.origin_x(), 95.0);
        assert_eq!(gt.origin_y(), 205.0);
    }

    #[test]
    fn test_extent_with_positive_y_scale() {
        // ModelTransformation rasters may carry a positive y coefficient
        let geo_transform = GeoTransform([350_000.0, 30.0, 0.0, 4_350_000.0, 0.0, 30.0]);
        let descriptor = RasterDescriptor {
            columns: 10,
            rows: 8,
            pixel_width: geo_transform.pixel_width(),
            pixel_height: geo_transform.pixel_height(),
            linear_unit: LinearUnit::metre(),
            crs: Crs::from_epsg(32618).unwrap(),
            crs_definition: None,
            geo_transform,
        };

        assert_eq!(descriptor.pixel_height, -30.0);
        assert_eq!(descriptor.resolution(), (30.0, 30.0));
        assert_eq!(descriptor.extent(), (350_000.0, 4_349_760.0, 350_300.0, 4_350_000.0));
    }

    #[test]
    fn test_crs_from_geo_keys() {
        let projected = HashMap::from([(1024, 1), (3072, 26918)]);
        assert_eq!(crs_from_geo_keys(&projected), Some((Crs::from_epsg(26918).unwrap(), true)));

        let geographic = HashMap::from([(1024, 2), (2048, 4326)]);
        assert_eq!(crs_from_geo_keys(&geographic), Some((Crs::wgs84(), false)));

        let user_defined = HashMap::from([(1024, 1), (3072, USER_DEFINED)]);
        assert_eq!(crs_from_geo_keys(&user_defined), None);
    }

    #[test]
    fn test_resample_options_validation() {
        let utm = Crs::from_epsg(32618).unwrap();
        assert!(ResampleOptions::new(utm, 10.0, 10.0).validate().is_ok());
        assert!(ResampleOptions::new(utm, 0.0, 10.0).validate().is_err());
        assert!(ResampleOptions::new(utm, 10.0, f64::NAN).validate().is_err());
    }
}
