use crate::error::{EcohydroError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file when none is given on the command line
pub const CONFIG_FILE_ENV: &str = "ECOHYDRO_CONFIG";

const GDAL_WARP_ENV: &str = "ECOHYDRO_GDAL_WARP";
const GDAL_TRANSLATE_ENV: &str = "ECOHYDRO_GDAL_TRANSLATE";
const OGR2OGR_ENV: &str = "ECOHYDRO_OGR2OGR";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for the acquisition tools.
///
/// The only settings are the executable paths of the GDAL/OGR command-line
/// tools; every tool is optional until an operation needs it.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub gdal_warp: ConfigValue<Option<PathBuf>>,
    pub gdal_translate: ConfigValue<Option<PathBuf>>,
    pub ogr2ogr: ConfigValue<Option<PathBuf>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            gdal_warp: ConfigValue::new(None, ConfigSource::Default),
            gdal_translate: ConfigValue::new(None, ConfigSource::Default),
            ogr2ogr: ConfigValue::new(None, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| EcohydroError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!(
                    "Failed to read config file {}: {}",
                    path.as_ref().display(),
                    e
                ),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| EcohydroError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(gdal) = file_config.gdal {
            if let Some(path) = gdal.gdal_warp {
                self.gdal_warp.update(Some(path), ConfigSource::File);
            }
            if let Some(path) = gdal.gdal_translate {
                self.gdal_translate.update(Some(path), ConfigSource::File);
            }
            if let Some(path) = gdal.ogr2ogr {
                self.ogr2ogr.update(Some(path), ConfigSource::File);
            }
        }

        Ok(self)
    }

    /// Load the file named by `explicit`, or by `ECOHYDRO_CONFIG` when absent
    pub fn load_from_optional_file(self, explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => self.load_from_file(path),
            None => match env::var(CONFIG_FILE_ENV) {
                Ok(path) if !path.is_empty() => self.load_from_file(path),
                _ => {
                    tracing::debug!("No configuration file given; using defaults");
                    Ok(self)
                }
            },
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Some(path) = env_path(GDAL_WARP_ENV) {
            self.gdal_warp.update(Some(path), ConfigSource::Environment);
        }

        if let Some(path) = env_path(GDAL_TRANSLATE_ENV) {
            self.gdal_translate.update(Some(path), ConfigSource::Environment);
        }

        if let Some(path) = env_path(OGR2OGR_ENV) {
            self.ogr2ogr.update(Some(path), ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(path) = overrides.gdal_warp {
            self.gdal_warp.update(Some(path), ConfigSource::Cli);
        }

        if let Some(path) = overrides.gdal_translate {
            self.gdal_translate.update(Some(path), ConfigSource::Cli);
        }

        if let Some(path) = overrides.ogr2ogr {
            self.ogr2ogr.update(Some(path), ConfigSource::Cli);
        }
    }

    pub fn require_gdal_warp(&self) -> Result<&Path> {
        require(&self.gdal_warp, "gdal.gdal_warp")
    }

    pub fn require_gdal_translate(&self) -> Result<&Path> {
        require(&self.gdal_translate, "gdal.gdal_translate")
    }

    pub fn require_ogr2ogr(&self) -> Result<&Path> {
        require(&self.ogr2ogr, "gdal.ogr2ogr")
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        for (key, value) in [
            ("gdal_warp", &self.gdal_warp),
            ("gdal_translate", &self.gdal_translate),
            ("ogr2ogr", &self.ogr2ogr),
        ] {
            let shown = value
                .value
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unset)".to_string());
            map.insert(key.to_string(), (shown, value.source));
        }

        map
    }
}

fn require<'a>(value: &'a ConfigValue<Option<PathBuf>>, key: &str) -> Result<&'a Path> {
    value
        .value
        .as_deref()
        .ok_or_else(|| EcohydroError::ConfigMissing { key: key.to_string() })
}

fn env_path(var: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(PathBuf::from(value.trim())),
        Ok(_) => {
            tracing::warn!("Ignoring empty {} value", var);
            None
        }
        Err(_) => None,
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    gdal: Option<GdalSection>,
}

#[derive(Debug, Deserialize, Serialize)]
struct GdalSection {
    gdal_warp: Option<PathBuf>,
    gdal_translate: Option<PathBuf>,
    ogr2ogr: Option<PathBuf>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub gdal_warp: Option<PathBuf>,
    pub gdal_translate: Option<PathBuf>,
    pub ogr2ogr: Option<PathBuf>,
}
