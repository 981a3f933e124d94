//! ESRI shapefile adapter
//!
//! Reads extents and point coordinates from existing layers and writes the
//! two layer kinds the drivers create: a study-area polygon and a point set.
//! A shapefile is addressed by its `.shp` path; its layer name is the file
//! stem.

use ecohydro_core::error::{EcohydroError, Result};
use ecohydro_core::LinearUnit;
use ecohydro_geo::{bbox, BoundingBox};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing, Reader, Shape, Writer};
use std::fs;
use std::path::Path;

use crate::lifecycle::{self, SHAPEFILE_SIDECARS};
use crate::srs::{self, WGS84_PRJ};

/// Width of the character attribute written by [`write_point_set`]
pub const POINT_ID_WIDTH: usize = 32;

const BBOX_ID_FIELD: &str = "id";

/// Seed of the running extent in [`bounding_box_of_features`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnionSeed {
    /// Start from the first feature's envelope
    #[default]
    FirstFeature,
    /// Start from `{min_x: 0, min_y: 90, max_x: -180, max_y: 0}`.
    ///
    /// Reproduces extents recorded by older projects: the result always
    /// includes longitude 0 and latitude 0.
    Legacy,
}

/// Equality filter on one attribute against a list of values.
///
/// The values are combined with AND, so a feature matches only when its
/// attribute equals every value. With more than one distinct value nothing
/// can match.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeFilter {
    attribute: String,
    values: Vec<String>,
    string_typed: bool,
}

impl AttributeFilter {
    pub fn new<S: AsRef<str>>(attribute: &str, values: &[S], string_typed: bool) -> Result<Self> {
        if values.is_empty() {
            return Err(EcohydroError::InvalidParameter {
                name: "id_values".to_string(),
                reason: "at least one identifier is required".to_string(),
            });
        }

        Ok(Self {
            attribute: attribute.to_string(),
            values: values.iter().map(|v| v.as_ref().to_string()).collect(),
            string_typed,
        })
    }

    /// OGR-style where clause.
    ///
    /// Only the first value is quoted for string attributes; later terms are
    /// rendered bare.
    pub fn where_clause(&self) -> String {
        let mut clause = if self.string_typed {
            format!("{}='{}'", self.attribute, self.values[0])
        } else {
            format!("{}={}", self.attribute, self.values[0])
        };
        for value in &self.values[1..] {
            clause.push_str(&format!(" and {}={}", self.attribute, value));
        }
        clause
    }

    pub fn matches(&self, record: &Record) -> bool {
        match record.get(&self.attribute) {
            Some(field) => self.values.iter().all(|v| field_equals(field, v)),
            None => false,
        }
    }
}

fn field_equals(field: &FieldValue, value: &str) -> bool {
    let number = || value.trim().parse::<f64>().ok();
    match field {
        FieldValue::Character(Some(s)) => s.trim_end() == value,
        FieldValue::Memo(s) => s == value,
        FieldValue::Numeric(Some(n)) => number() == Some(*n),
        FieldValue::Float(Some(f)) => number() == Some(*f as f64),
        FieldValue::Integer(i) => number() == Some(*i as f64),
        FieldValue::Double(d) => number() == Some(*d),
        FieldValue::Currency(c) => number() == Some(*c),
        _ => false,
    }
}

fn is_string_field(field: Option<&FieldValue>) -> bool {
    matches!(field, None | Some(FieldValue::Character(_)) | Some(FieldValue::Memo(_)))
}

/// Read every feature of a shapefile; the files are closed on return
fn read_features(path: &Path) -> Result<Vec<(Shape, Record)>> {
    lifecycle::ensure_readable_file(path)?;
    let mut reader = Reader::from_path(path).map_err(|e| EcohydroError::FormatError {
        format: "Shapefile".to_string(),
        message: format!("Failed to open {}: {}", path.display(), e),
    })?;

    reader
        .iter_shapes_and_records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| EcohydroError::FormatError {
            format: "Shapefile".to_string(),
            message: format!("Failed to read feature of {}: {}", path.display(), e),
        })
}

/// Envelope of a shape as `(min_x, min_y, max_x, max_y)`; `None` for null shapes
fn shape_envelope(shape: &Shape) -> Option<(f64, f64, f64, f64)> {
    match shape {
        Shape::NullShape => None,
        Shape::Point(p) => Some((p.x, p.y, p.x, p.y)),
        Shape::PointM(p) => Some((p.x, p.y, p.x, p.y)),
        Shape::PointZ(p) => Some((p.x, p.y, p.x, p.y)),
        Shape::Polyline(s) => Some((s.bbox().min.x, s.bbox().min.y, s.bbox().max.x, s.bbox().max.y)),
        Shape::PolylineM(s) => Some((s.bbox().min.x, s.bbox().min.y, s.bbox().max.x, s.bbox().max.y)),
        Shape::PolylineZ(s) => Some((s.bbox().min.x, s.bbox().min.y, s.bbox().max.x, s.bbox().max.y)),
        Shape::Polygon(s) => Some((s.bbox().min.x, s.bbox().min.y, s.bbox().max.x, s.bbox().max.y)),
        Shape::PolygonM(s) => Some((s.bbox().min.x, s.bbox().min.y, s.bbox().max.x, s.bbox().max.y)),
        Shape::PolygonZ(s) => Some((s.bbox().min.x, s.bbox().min.y, s.bbox().max.x, s.bbox().max.y)),
        Shape::Multipoint(s) => Some((s.bbox().min.x, s.bbox().min.y, s.bbox().max.x, s.bbox().max.y)),
        Shape::MultipointM(s) => Some((s.bbox().min.x, s.bbox().min.y, s.bbox().max.x, s.bbox().max.y)),
        Shape::MultipointZ(s) => Some((s.bbox().min.x, s.bbox().min.y, s.bbox().max.x, s.bbox().max.y)),
        Shape::Multipatch(s) => Some((s.bbox().min.x, s.bbox().min.y, s.bbox().max.x, s.bbox().max.y)),
    }
}

fn point_coordinates(shape: &Shape) -> Option<(f64, f64)> {
    match shape {
        Shape::Point(p) => Some((p.x, p.y)),
        Shape::PointM(p) => Some((p.x, p.y)),
        Shape::PointZ(p) => Some((p.x, p.y)),
        _ => None,
    }
}

/// WGS84 extent of every feature in a shapefile, buffered by `buffer_degrees`.
///
/// Each envelope's lower-left and upper-right corners are reprojected to
/// WGS84 and folded into a running min/max.
pub fn bounding_box_of_features(
    path: &Path,
    buffer_degrees: f64,
    seed: UnionSeed,
) -> Result<BoundingBox> {
    let transformer = srs::layer_srs(path)?.transformer_to_wgs84()?;
    let features = read_features(path)?;

    let mut extent: Option<(f64, f64, f64, f64)> = match seed {
        UnionSeed::FirstFeature => None,
        UnionSeed::Legacy => Some((0.0, 90.0, -180.0, 0.0)),
    };
    let mut with_geometry = 0usize;

    for (shape, _) in &features {
        let Some((min_x, min_y, max_x, max_y)) = shape_envelope(shape) else {
            continue;
        };

        let (min_x, min_y) = transformer.convert(min_x, min_y)?;
        let (max_x, max_y) = transformer.convert(max_x, max_y)?;
        with_geometry += 1;

        extent = Some(match extent {
            None => (min_x, min_y, max_x, max_y),
            Some((a, b, c, d)) => (a.min(min_x), b.min(min_y), c.max(max_x), d.max(max_y)),
        });
    }

    let (min_x, min_y, max_x, max_y) = match extent {
        Some(extent) if with_geometry > 0 => extent,
        _ => return Err(EcohydroError::EmptyLayer { path: path.to_path_buf() }),
    };

    tracing::debug!("Extent of {} feature(s) in {}", with_geometry, path.display());
    bbox::buffer(&BoundingBox::wgs84(min_x, min_y, max_x, max_y)?, buffer_degrees)
}

/// WGS84 coordinates of the point features whose `id_attribute` matches
/// `id_values` (see [`AttributeFilter`] for the matching rule).
pub fn coordinates_of_points<S: AsRef<str>>(
    path: &Path,
    layer_name: &str,
    id_attribute: &str,
    id_values: &[S],
) -> Result<Vec<(f64, f64)>> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if stem != layer_name {
        return Err(EcohydroError::LayerNotFound {
            layer: layer_name.to_string(),
            path: path.to_path_buf(),
        });
    }
    if id_values.is_empty() {
        return Err(EcohydroError::InvalidParameter {
            name: "id_values".to_string(),
            reason: "at least one identifier is required".to_string(),
        });
    }

    let layer_srs = srs::layer_srs(path)?;
    let features = read_features(path)?;

    let string_typed = is_string_field(features.first().and_then(|(_, r)| r.get(id_attribute)));
    let filter = AttributeFilter::new(id_attribute, id_values, string_typed)?;
    tracing::debug!("Selecting features of {} where {}", layer_name, filter.where_clause());

    let transformer = if layer_srs.is_wgs84() { None } else { Some(layer_srs.transformer_to_wgs84()?) };

    let mut coordinates = Vec::new();
    for (shape, record) in features.iter().filter(|(_, record)| filter.matches(record)) {
        let (x, y) = point_coordinates(shape).ok_or_else(|| EcohydroError::FormatError {
            format: "Shapefile".to_string(),
            message: format!("feature matching {} in {} is not a point", filter.where_clause(), layer_name),
        })?;
        coordinates.push(match &transformer {
            Some(t) => t.convert(x, y)?,
            None => (x, y),
        });
    }

    if coordinates.is_empty() {
        return Err(EcohydroError::NoMatchingFeature {
            filter: filter.where_clause(),
            layer: layer_name.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(coordinates)
}

fn field_name(name: &str) -> Result<FieldName> {
    FieldName::try_from(name).map_err(|e| EcohydroError::InvalidParameter {
        name: "attribute".to_string(),
        reason: format!("'{}' is not a valid DBF field name: {:?}", name, e),
    })
}

fn write_error(path: &Path, e: shapefile::Error) -> EcohydroError {
    EcohydroError::FormatError {
        format: "Shapefile".to_string(),
        message: format!("Failed to write {}: {}", path.display(), e),
    }
}

/// Resolve `<output_dir>/<layer_name>.shp`, refusing to replace an existing layer
fn new_layer_path(output_dir: &Path, layer_name: &str) -> Result<(String, std::path::PathBuf)> {
    let output_dir = lifecycle::ensure_writable_dir(output_dir)?;
    let filename = format!("{}.shp", layer_name);
    let path = output_dir.join(&filename);
    if path.exists() {
        return Err(EcohydroError::AlreadyExists { path });
    }
    Ok((filename, path))
}

/// Write a WGS84 box as a single-polygon layer; returns the `.shp` file name
pub fn write_bounding_box_polygon(
    bbox: &BoundingBox,
    output_dir: &Path,
    layer_name: &str,
) -> Result<String> {
    bbox.require_wgs84()?;
    let (filename, path) = new_layer_path(output_dir, layer_name)?;

    let mut ring: Vec<Point> = bbox.corners().iter().map(|&(x, y)| Point::new(x, y)).collect();
    ring.push(ring[0]);
    let polygon = Polygon::new(PolygonRing::Outer(ring));

    let table = TableWriterBuilder::new().add_numeric_field(field_name(BBOX_ID_FIELD)?, 10, 0);
    let mut record = Record::default();
    record.insert(BBOX_ID_FIELD.to_string(), FieldValue::Numeric(Some(1.0)));

    {
        let mut writer = Writer::from_path(&path, table).map_err(|e| write_error(&path, e))?;
        writer.write_shape_and_record(&polygon, &record).map_err(|e| write_error(&path, e))?;
    }
    fs::write(path.with_extension("prj"), WGS84_PRJ)?;

    tracing::info!("Wrote bounding box {} to {}", bbox.to_wire_string(), path.display());
    Ok(filename)
}

/// Write WGS84 points with a string identifier; returns the `.shp` file name
pub fn write_point_set<S: AsRef<str>>(
    output_dir: &Path,
    layer_name: &str,
    id_attribute: &str,
    ids: &[S],
    coordinates: &[(f64, f64)],
) -> Result<String> {
    if ids.len() != coordinates.len() {
        return Err(EcohydroError::InvalidParameter {
            name: "coordinates".to_string(),
            reason: format!("{} identifiers but {} coordinate pairs", ids.len(), coordinates.len()),
        });
    }
    if let Some(long) = ids.iter().find(|id| id.as_ref().len() > POINT_ID_WIDTH) {
        return Err(EcohydroError::InvalidParameter {
            name: "ids".to_string(),
            reason: format!("'{}' exceeds {} characters", long.as_ref(), POINT_ID_WIDTH),
        });
    }

    let id_field = field_name(id_attribute)?;
    let (filename, path) = new_layer_path(output_dir, layer_name)?;
    let table = TableWriterBuilder::new().add_character_field(id_field, POINT_ID_WIDTH as u8);

    {
        let mut writer = Writer::from_path(&path, table).map_err(|e| write_error(&path, e))?;
        for (id, &(x, y)) in ids.iter().zip(coordinates) {
            let mut record = Record::default();
            record.insert(id_attribute.to_string(), FieldValue::Character(Some(id.as_ref().to_string())));
            writer
                .write_shape_and_record(&Point::new(x, y), &record)
                .map_err(|e| write_error(&path, e))?;
        }
    }
    fs::write(path.with_extension("prj"), WGS84_PRJ)?;

    tracing::info!("Wrote {} point(s) to {}", ids.len(), path.display());
    Ok(filename)
}

/// Remove a shapefile and all of its sidecars
pub fn delete_shapefile(path: &Path) -> Result<()> {
    lifecycle::delete_artifact_group(path, SHAPEFILE_SIDECARS)?;
    Ok(())
}

/// Linear unit of a shapefile's projected CRS
pub fn linear_unit_of_shapefile(path: &Path) -> Result<LinearUnit> {
    let prj_path = path.with_extension("prj");
    if !prj_path.exists() {
        return Ok(LinearUnit::unknown());
    }
    let wkt = fs::read_to_string(&prj_path).map_err(|e| EcohydroError::Unreadable {
        path: prj_path.clone(),
        reason: e.to_string(),
    })?;
    Ok(srs::linear_unit_from_wkt(&wkt))
}

/// Multiplier converting the layer's linear unit to metres
pub fn linear_unit_conversion_factor(path: &Path) -> Result<f64> {
    Ok(linear_unit_of_shapefile(path)?.meters_per_unit)
}
