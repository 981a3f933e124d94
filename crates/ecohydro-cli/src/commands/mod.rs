//! Command implementations

mod bbox;
mod config;
mod import_dem;
mod import_soil;
mod raster_info;
mod register_gage;
mod study_area;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use ecohydro_core::{MetadataStore, TomlMetadataStore};
use std::path::Path;

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    match &cli.command {
        Commands::StudyArea(args) => study_area::execute(args, &output),
        Commands::RegisterGage(args) => register_gage::execute(args, &output),
        Commands::ImportDem(args) => import_dem::execute(args, &cli, &output),
        Commands::ImportSoil(args) => import_soil::execute(args, &cli, &output),
        Commands::Bbox(args) => bbox::execute(args, &output),
        Commands::RasterInfo(args) => raster_info::execute(args, &output),
        Commands::Config => config::execute(&cli, &output),
    }
}

fn open_project(project_dir: &Path) -> Result<TomlMetadataStore> {
    TomlMetadataStore::open(project_dir)
        .with_context(|| format!("Cannot open project {}", project_dir.display()))
}

/// Record the invoking command line in the project's processing history
fn record_history(store: &TomlMetadataStore) -> Result<()> {
    let command = std::env::args().collect::<Vec<_>>().join(" ");
    store
        .append_processing_history(&command)
        .context("Failed to record processing history")
}
