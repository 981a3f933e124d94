//! Raster-info command implementation

use crate::cli::RasterInfoArgs;
use crate::output::OutputWriter;
use crate::output_types::RasterInfoOutput;
use anyhow::Result;
use ecohydro_store::raster;

pub fn execute(args: &RasterInfoArgs, output: &OutputWriter) -> Result<()> {
    let descriptor = raster::describe(&args.path)?;
    let bbox = raster::bounding_box_of(&args.path)?;

    output.result(
        "Raster",
        &RasterInfoOutput {
            path: args.path.display().to_string(),
            columns: descriptor.columns,
            rows: descriptor.rows,
            pixel_width: descriptor.pixel_width,
            pixel_height: descriptor.pixel_height,
            crs: descriptor.crs.to_string(),
            crs_definition: descriptor.crs_definition,
            linear_unit: descriptor.linear_unit.name,
            meters_per_unit: descriptor.linear_unit.meters_per_unit,
            bbox_wgs84: bbox.to_wire_string(),
        },
    )
}
