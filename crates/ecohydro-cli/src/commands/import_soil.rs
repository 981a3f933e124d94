//! Import-soil command implementation

use crate::cli::{Cli, ImportSoilArgs};
use crate::config_loader;
use crate::output::OutputWriter;
use crate::output_types::ImportSoilOutput;
use anyhow::{Context, Result};
use ecohydro_core::{Crs, MetadataStore};
use ecohydro_store::gml;

pub fn execute(args: &ImportSoilArgs, cli: &Cli, output: &OutputWriter) -> Result<()> {
    let store = super::open_project(&args.project_dir)?;

    // Soil polygons are stored in the CRS of the DEM
    let dem_srs: Crs = store
        .read_study_area_entry("dem_srs")
        .context("Import a DEM before importing soil features")?
        .parse()?;

    let source_crs = gml::crs_of_gml(&args.gml)?;
    tracing::debug!("{} is in {}", args.gml.display(), source_crs);

    let tools = config_loader::load_tools(cli)?;
    let shapefile =
        gml::convert_gml_to_shapefile(&tools, &args.project_dir, &args.gml, &args.outfile, &dem_srs)
            .with_context(|| format!("Failed to convert {}", args.gml.display()))?;

    store.write_manifest_entry("soil_features", &shapefile)?;
    super::record_history(&store)?;

    output.result(
        "Soil features",
        &ImportSoilOutput { soil_features: shapefile, srs: dem_srs.to_string() },
    )
}
