//! Study-area command implementation

use crate::cli::StudyAreaArgs;
use crate::output::OutputWriter;
use crate::output_types::StudyAreaOutput;
use anyhow::{Context, Result};
use ecohydro_core::MetadataStore;
use ecohydro_geo::{bbox, BoundingBox};
use ecohydro_store::vector::{self, UnionSeed};

pub fn execute(args: &StudyAreaArgs, output: &OutputWriter) -> Result<()> {
    let store = super::open_project(&args.project_dir)?;

    let study_area = match (&args.bbox, &args.shapefile) {
        (Some(wire), _) => wire
            .parse::<BoundingBox>()
            .with_context(|| format!("Invalid bounding box '{}'", wire))?,
        (None, Some(shapefile)) => {
            let seed = if args.legacy_union { UnionSeed::Legacy } else { UnionSeed::FirstFeature };
            vector::bounding_box_of_features(shapefile, args.buffer, seed)
                .with_context(|| format!("Failed to read extent of {}", shapefile.display()))?
        }
        (None, None) => anyhow::bail!("Either --bbox or --shapefile is required"),
    };

    let layer_path = args.project_dir.join(format!("{}.shp", args.outfile));
    if args.overwrite {
        vector::delete_shapefile(&layer_path)?;
    }

    let shapefile = vector::write_bounding_box_polygon(&study_area, &args.project_dir, &args.outfile)
        .context("Failed to write study-area polygon")?;

    store.write_study_area_entry("bbox_wgs84", &study_area.to_wire_string())?;
    store.write_manifest_entry("study_area_shapefile", &shapefile)?;
    super::record_history(&store)?;

    let area_sq_km = bbox::area_sq_meters(&study_area)? / 1.0e6;
    output.result(
        "Study area",
        &StudyAreaOutput { bbox_wgs84: study_area.to_wire_string(), shapefile, area_sq_km },
    )
}
