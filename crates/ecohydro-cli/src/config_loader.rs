//! Configuration loading for CLI commands

use anyhow::{Context, Result};
use ecohydro_core::config::{CliConfigOverrides, LayeredConfig};
use ecohydro_store::GdalTools;

use crate::cli::Cli;

/// Defaults, then the config file, then the environment, then command-line flags
pub fn load_config(cli: &Cli) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults()
        .load_from_optional_file(cli.config.as_deref())
        .context("Failed to load configuration file")?
        .load_from_env();

    config.update_from_cli(CliConfigOverrides {
        gdal_warp: cli.gdal_warp.clone(),
        gdal_translate: cli.gdal_translate.clone(),
        ogr2ogr: cli.ogr2ogr.clone(),
    });
    Ok(config)
}

pub fn load_tools(cli: &Cli) -> Result<GdalTools> {
    Ok(GdalTools::from_config(load_config(cli)?))
}
