//! GML feature collections: CRS inspection and conversion to shapefile

use ecohydro_core::error::{EcohydroError, Result};
use ecohydro_core::{Crs, LinearUnit};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::ffi::OsStr;
use std::path::Path;

use crate::lifecycle;
use crate::srs;
use crate::tools::GdalTools;

/// Convert a GML file to `<output_dir>/<layer_name>.shp` reprojected to
/// `target_crs`; returns the shapefile name.
///
/// Nothing is done when the shapefile already exists.
pub fn convert_gml_to_shapefile(
    tools: &GdalTools,
    output_dir: &Path,
    gml_path: &Path,
    layer_name: &str,
    target_crs: &Crs,
) -> Result<String> {
    let output_dir = lifecycle::ensure_writable_dir(output_dir)?;
    let filename = format!("{}.shp", layer_name);
    let output = output_dir.join(&filename);
    if lifecycle::exists_idempotent(&output) {
        return Ok(filename);
    }

    lifecycle::ensure_readable_file(gml_path)?;
    let ogr2ogr = tools.ogr2ogr()?;
    let target = target_crs.to_string();
    ogr2ogr.run([
        OsStr::new("-f"),
        OsStr::new("ESRI Shapefile"),
        OsStr::new("-nln"),
        OsStr::new(layer_name),
        OsStr::new("-t_srs"),
        OsStr::new(&target),
        output.as_os_str(),
        gml_path.as_os_str(),
    ])?;

    tracing::info!("Converted {} to {}", gml_path.display(), output.display());
    Ok(filename)
}

/// Parse a GML `srsName`: `EPSG:n`, `urn:ogc:def:crs:EPSG::n` or
/// `http://www.opengis.net/gml/srs/epsg.xml#n`
pub fn parse_srs_name(srs_name: &str) -> Result<Crs> {
    let code = if let Some(code) = srs_name.strip_prefix("EPSG:") {
        code
    } else if let Some(rest) = srs_name.strip_prefix("urn:ogc:def:crs:EPSG:") {
        // Optional version between the two colons
        rest.rsplit(':').next().unwrap_or(rest)
    } else if let Some((_, code)) = srs_name.split_once("epsg.xml#") {
        code
    } else {
        return Err(EcohydroError::InvalidCrs {
            crs: srs_name.to_string(),
            reason: "unrecognised srsName".to_string(),
        });
    };

    code.trim()
        .parse::<u32>()
        .map_err(|e| EcohydroError::InvalidCrs { crs: srs_name.to_string(), reason: e.to_string() })
        .and_then(Crs::from_epsg)
}

/// CRS named by the first `srsName` attribute of a GML document
pub fn crs_of_gml(path: &Path) -> Result<Crs> {
    lifecycle::ensure_readable_file(path)?;
    let mut reader = Reader::from_file(path).map_err(|e| EcohydroError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"srsName" {
                        let value = attr.unescape_value().map_err(|err| EcohydroError::FormatError {
                            format: "GML".to_string(),
                            message: err.to_string(),
                        })?;
                        return parse_srs_name(&value);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(EcohydroError::FormatError {
                    format: "GML".to_string(),
                    message: format!("Invalid XML in {}: {}", path.display(), e),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Err(EcohydroError::FormatError {
        format: "GML".to_string(),
        message: format!("No srsName attribute in {}", path.display()),
    })
}

/// Linear unit of the CRS a GML document is expressed in
pub fn linear_unit_of_gml(path: &Path) -> Result<LinearUnit> {
    Ok(srs::linear_unit_of_crs(&crs_of_gml(path)?))
}
