//! Import-dem command implementation

use crate::cli::{Cli, ImportDemArgs};
use crate::config_loader;
use crate::output::OutputWriter;
use crate::output_types::ImportDemOutput;
use anyhow::{Context, Result};
use ecohydro_core::{Crs, MetadataStore};
use ecohydro_geo::{utm_crs_for_bounding_box, BoundingBox};
use ecohydro_store::raster::{self, ResampleMethod, ResampleOptions};

pub fn execute(args: &ImportDemArgs, cli: &Cli, output: &OutputWriter) -> Result<()> {
    let store = super::open_project(&args.project_dir)?;
    let method: ResampleMethod = args.method.parse()?;
    let (res_x, res_y) = match args.resolution.as_slice() {
        [x, y] => (*x, *y),
        _ => anyhow::bail!("--resolution takes exactly two values"),
    };

    let target_crs = match &args.t_srs {
        Some(srs) => srs.parse::<Crs>()?,
        None => {
            let study_area: BoundingBox = store
                .read_study_area_entry("bbox_wgs84")?
                .parse()
                .context("Recorded bbox_wgs84 is not a valid bounding box")?;
            let crs = utm_crs_for_bounding_box(&study_area)?;
            output.info(format!("Using {} for the study area", crs));
            crs
        }
    };

    let mut options = ResampleOptions::new(target_crs, res_x, res_y).with_method(method);
    if let Some(srs) = &args.s_srs {
        options = options.with_source_crs(srs.parse::<Crs>()?);
    }

    let tools = config_loader::load_tools(cli)?;
    let dem_name = format!("{}.tif", args.outfile);
    let dem_path = raster::resample(&tools, &args.project_dir, &args.input, &dem_name, &options)
        .with_context(|| format!("Failed to import DEM {}", args.input.display()))?;

    let descriptor = raster::describe(&dem_path)?;

    store.write_manifest_entry("dem", &dem_name)?;
    store.write_study_area_entry("dem_res_x", &res_x.to_string())?;
    store.write_study_area_entry("dem_res_y", &res_y.to_string())?;
    store.write_study_area_entry("dem_srs", &target_crs.to_string())?;
    store.write_study_area_entry("dem_columns", &descriptor.columns.to_string())?;
    store.write_study_area_entry("dem_rows", &descriptor.rows.to_string())?;

    if args.delete_input {
        raster::delete_geotiff(&args.input)?;
    }
    super::record_history(&store)?;

    output.result(
        "DEM",
        &ImportDemOutput {
            dem: dem_name,
            dem_srs: target_crs.to_string(),
            dem_res_x: res_x,
            dem_res_y: res_y,
            dem_columns: descriptor.columns,
            dem_rows: descriptor.rows,
            input_deleted: args.delete_input,
        },
    )
}
