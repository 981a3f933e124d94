use std::collections::BTreeMap;

use crate::error::{EcohydroError, Result};

/// Port for project provenance metadata.
///
/// A project directory carries two flat string tables: `study_area`
/// (attributes of the study area such as `bbox_wgs84` or `dem_srs`) and
/// `manifest` (artifact names such as `dem` or `gage`), plus an
/// append-only processing history.
pub trait MetadataStore {
    /// Read every study-area attribute
    fn read_study_area_entries(&self) -> Result<BTreeMap<String, String>>;

    /// Read one study-area attribute, failing when it was never recorded
    fn read_study_area_entry(&self, key: &str) -> Result<String> {
        self.read_study_area_entries()?
            .remove(key)
            .ok_or_else(|| EcohydroError::ConfigMissing {
                key: format!("study_area.{}", key),
            })
    }

    /// Record a study-area attribute, replacing any previous value
    fn write_study_area_entry(&self, key: &str, value: &str) -> Result<()>;

    fn read_manifest_entry(&self, key: &str) -> Result<Option<String>>;

    fn write_manifest_entry(&self, key: &str, value: &str) -> Result<()>;

    /// Append a command line to the processing history
    fn append_processing_history(&self, command: &str) -> Result<()>;
}
