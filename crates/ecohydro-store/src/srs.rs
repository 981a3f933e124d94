//! Spatial reference helpers shared by the vector and raster adapters:
//! `.prj` parsing, PROJ definitions and linear units.

use ecohydro_core::error::{EcohydroError, Result};
use ecohydro_core::{Crs, LinearUnit};
use ecohydro_geo::CrsTransformer;
use proj::Proj;
use std::fs;
use std::path::Path;

/// ESRI WKT written alongside every WGS84 shapefile
pub const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

const AUTHORITY_EPSG: &str = "AUTHORITY[\"EPSG\",\"";

/// Spatial reference of a vector layer
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSrs {
    /// Recognised EPSG code
    Epsg(Crs),
    /// WKT with no recognisable EPSG authority
    Wkt(String),
}

impl LayerSrs {
    pub fn is_wgs84(&self) -> bool {
        matches!(self, LayerSrs::Epsg(crs) if crs.is_wgs84())
    }

    /// Definition string handed to PROJ
    pub fn definition(&self) -> String {
        match self {
            LayerSrs::Epsg(crs) => crs.definition(),
            LayerSrs::Wkt(wkt) => wkt.clone(),
        }
    }

    pub fn transformer_to_wgs84(&self) -> Result<CrsTransformer> {
        match self {
            LayerSrs::Epsg(crs) => CrsTransformer::new(crs, &Crs::wgs84()),
            LayerSrs::Wkt(wkt) => CrsTransformer::from_definitions(wkt, &Crs::wgs84().definition()),
        }
    }

    pub fn transformer_from_wgs84(&self) -> Result<CrsTransformer> {
        match self {
            LayerSrs::Epsg(crs) => CrsTransformer::new(&Crs::wgs84(), crs),
            LayerSrs::Wkt(wkt) => CrsTransformer::from_definitions(&Crs::wgs84().definition(), wkt),
        }
    }
}

/// Interpret the WKT of a `.prj` file
pub fn parse_prj(wkt: &str) -> Result<LayerSrs> {
    let wkt = wkt.trim();

    if let Some(epsg) = root_authority_code(wkt) {
        return Ok(LayerSrs::Epsg(Crs::from_epsg(epsg)?));
    }

    if !wkt.starts_with("PROJCS") && (wkt.contains("GCS_WGS_1984") || wkt.contains("\"WGS 84\"")) {
        return Ok(LayerSrs::Epsg(Crs::wgs84()));
    }

    if wkt.is_empty() {
        return Err(EcohydroError::FormatError {
            format: "WKT".to_string(),
            message: "empty projection definition".to_string(),
        });
    }

    Ok(LayerSrs::Wkt(wkt.to_string()))
}

/// EPSG code of the root node's AUTHORITY.
///
/// The root AUTHORITY is the last child of the root node, so only an
/// authority followed by nothing but the closing brackets of its own node
/// and the root qualifies. Nested GEOGCS or UNIT authorities do not.
fn root_authority_code(wkt: &str) -> Option<u32> {
    let start = wkt.rfind(AUTHORITY_EPSG)?;
    let rest = &wkt[start + AUTHORITY_EPSG.len()..];
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let tail = rest[digits..].strip_prefix('"')?;

    let closing: Vec<char> = tail.chars().filter(|c| !c.is_whitespace()).collect();
    if closing.len() == 2 && closing.iter().all(|&c| c == ']') {
        rest[..digits].parse().ok()
    } else {
        None
    }
}

/// Spatial reference of the shapefile at `shp_path`.
///
/// A missing `.prj` is taken to mean WGS84.
pub fn layer_srs(shp_path: &Path) -> Result<LayerSrs> {
    let prj_path = shp_path.with_extension("prj");
    if !prj_path.exists() {
        tracing::warn!("{} has no .prj file, assuming EPSG:4326", shp_path.display());
        return Ok(LayerSrs::Epsg(Crs::wgs84()));
    }

    let wkt = fs::read_to_string(&prj_path).map_err(|e| EcohydroError::Unreadable {
        path: prj_path.clone(),
        reason: e.to_string(),
    })?;
    parse_prj(&wkt)
}

/// Linear unit of a projected WKT: the last `UNIT[...]` of a `PROJCS`.
/// Geographic definitions report the unknown unit.
pub fn linear_unit_from_wkt(wkt: &str) -> LinearUnit {
    if !wkt.trim_start().starts_with("PROJCS") {
        return LinearUnit::unknown();
    }

    let Some(start) = wkt.rfind("UNIT[") else {
        return LinearUnit::unknown();
    };

    let body = &wkt[start + "UNIT[".len()..];
    let mut parts = body.splitn(3, ',');
    let name = parts.next().map(|n| n.trim().trim_matches('"').to_string());
    let factor = parts
        .next()
        .map(|f| f.trim_end_matches(']').trim())
        .and_then(|f| f.parse::<f64>().ok());

    match (name, factor) {
        (Some(name), Some(factor)) if factor > 0.0 => LinearUnit::new(name, factor),
        _ => LinearUnit::unknown(),
    }
}

/// PROJ definition string of an EPSG CRS, e.g. `proj=utm zone=18 datum=NAD83 units=m`.
///
/// `None` when PROJ cannot express the CRS as a PROJ string.
pub fn proj_definition(crs: &Crs) -> Option<String> {
    let proj = Proj::new(&crs.definition()).ok()?;
    let definition = proj.def().ok()?;
    if definition.trim().is_empty() {
        None
    } else {
        Some(definition)
    }
}

/// Linear unit declared by a PROJ definition through `units=` or `to_meter=`.
/// Geographic (`longlat`) definitions report the unknown unit.
pub fn linear_unit_from_proj_definition(definition: &str) -> LinearUnit {
    let mut units = None;
    let mut to_meter = None;
    let mut geographic = false;

    for token in definition.split_whitespace() {
        let token = token.trim_start_matches('+');
        match token.split_once('=') {
            Some(("units", value)) => units = Some(value),
            Some(("to_meter", value)) => to_meter = value.parse::<f64>().ok(),
            Some(("proj", "longlat")) | Some(("proj", "latlong")) => geographic = true,
            _ => {}
        }
    }

    if geographic {
        return LinearUnit::unknown();
    }
    if let Some(unit) = units.and_then(LinearUnit::from_proj_units) {
        return unit;
    }
    match to_meter {
        Some(factor) if factor > 0.0 => LinearUnit::new(format!("{} m", factor), factor),
        _ => LinearUnit::unknown(),
    }
}

/// Linear unit of an EPSG CRS as PROJ describes it
pub fn linear_unit_of_crs(crs: &Crs) -> LinearUnit {
    proj_definition(crs)
        .map(|definition| linear_unit_from_proj_definition(&definition))
        .unwrap_or_else(LinearUnit::unknown)
}
