//! Register-gage command implementation

use crate::cli::RegisterGageArgs;
use crate::output::OutputWriter;
use crate::output_types::RegisterGageOutput;
use anyhow::{bail, Context, Result};
use ecohydro_core::MetadataStore;
use ecohydro_geo::{bbox, BoundingBox};
use ecohydro_store::vector;

/// Identifier attribute of the project's gage layer, whatever the source calls it
pub const GAGE_ID_ATTRIBUTE: &str = "gage_id";

pub fn execute(args: &RegisterGageArgs, output: &OutputWriter) -> Result<()> {
    let store = super::open_project(&args.project_dir)?;
    let study_area: BoundingBox = store
        .read_study_area_entry("bbox_wgs84")?
        .parse()
        .context("Recorded bbox_wgs84 is not a valid bounding box")?;

    if args.id_value.len() > vector::POINT_ID_WIDTH {
        bail!("Gage id '{}' exceeds {} characters", args.id_value, vector::POINT_ID_WIDTH);
    }

    let coordinates = vector::coordinates_of_points(
        &args.gage_file,
        &args.layer_name,
        &args.id_attribute,
        &[args.id_value.as_str()],
    )
    .with_context(|| format!("Failed to locate gage {}", args.id_value))?;
    let (lon, lat) = coordinates[0];
    if coordinates.len() > 1 {
        output.warning(format!(
            "{} features match gage {}; using the first",
            coordinates.len(),
            args.id_value
        ));
    }

    if !bbox::contains(&study_area, lon, lat)? {
        bail!(
            "Gage {} at ({}, {}) lies outside the study area {}",
            args.id_value,
            lon,
            lat,
            study_area.to_wire_string()
        );
    }

    // Registering again replaces the previous gage layer
    let layer_path = args.project_dir.join(format!("{}.shp", args.outfile));
    vector::delete_shapefile(&layer_path)?;

    let gage = vector::write_point_set(
        &args.project_dir,
        &args.outfile,
        GAGE_ID_ATTRIBUTE,
        &[args.id_value.as_str()],
        &[(lon, lat)],
    )
    .context("Failed to write gage layer")?;

    store.write_manifest_entry("gage", &gage)?;
    store.write_study_area_entry("gage_id_attr", GAGE_ID_ATTRIBUTE)?;
    store.write_study_area_entry("gage_id", &args.id_value)?;
    store.write_study_area_entry("gage_lat_wgs84", &lat.to_string())?;
    store.write_study_area_entry("gage_lon_wgs84", &lon.to_string())?;
    super::record_history(&store)?;

    output.result(
        "Gage",
        &RegisterGageOutput {
            gage,
            gage_id_attr: GAGE_ID_ATTRIBUTE.to_string(),
            gage_id: args.id_value.clone(),
            gage_lon_wgs84: lon,
            gage_lat_wgs84: lat,
        },
    )
}
