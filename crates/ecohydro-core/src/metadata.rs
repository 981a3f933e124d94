//! TOML-backed project metadata.
//!
//! Every project directory holds a single `metadata.toml`. The file is
//! re-read before each access and rewritten after each change, so several
//! driver invocations in sequence always observe each other's entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EcohydroError, Result};
use crate::ports::MetadataStore;

/// Name of the metadata file inside a project directory
pub const METADATA_FILENAME: &str = "metadata.toml";

/// One processing step recorded in the project history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub timestamp: DateTime<Utc>,
    pub command: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetadataDocument {
    #[serde(default)]
    manifest: BTreeMap<String, String>,
    #[serde(default)]
    study_area: BTreeMap<String, String>,
    #[serde(default)]
    processing_history: Vec<ProcessingStep>,
}

/// Metadata store persisted as `<project>/metadata.toml`
#[derive(Debug, Clone)]
pub struct TomlMetadataStore {
    project_dir: PathBuf,
    path: PathBuf,
}

impl TomlMetadataStore {
    /// Open the metadata of a project directory; the file itself is created on first write
    pub fn open(project_dir: impl AsRef<Path>) -> Result<Self> {
        let project_dir = project_dir.as_ref().to_path_buf();
        if !project_dir.is_dir() {
            return Err(EcohydroError::NotADirectory { path: project_dir });
        }

        let path = project_dir.join(METADATA_FILENAME);
        Ok(Self { project_dir, path })
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recorded processing steps, oldest first
    pub fn processing_history(&self) -> Result<Vec<ProcessingStep>> {
        Ok(self.load()?.processing_history)
    }

    fn load(&self) -> Result<MetadataDocument> {
        if !self.path.exists() {
            return Ok(MetadataDocument::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| EcohydroError::Unreadable {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| {
            EcohydroError::Serialization(format!(
                "Failed to parse {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, document: &MetadataDocument) -> Result<()> {
        let content = toml::to_string_pretty(document)
            .map_err(|e| EcohydroError::Serialization(e.to_string()))?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn modify<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut MetadataDocument),
    {
        let mut document = self.load()?;
        change(&mut document);
        self.save(&document)
    }
}

impl MetadataStore for TomlMetadataStore {
    fn read_study_area_entries(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.load()?.study_area)
    }

    fn write_study_area_entry(&self, key: &str, value: &str) -> Result<()> {
        tracing::debug!("study_area.{} = {}", key, value);
        self.modify(|doc| {
            doc.study_area.insert(key.to_string(), value.to_string());
        })
    }

    fn read_manifest_entry(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.manifest.remove(key))
    }

    fn write_manifest_entry(&self, key: &str, value: &str) -> Result<()> {
        tracing::debug!("manifest.{} = {}", key, value);
        self.modify(|doc| {
            doc.manifest.insert(key.to_string(), value.to_string());
        })
    }

    fn append_processing_history(&self, command: &str) -> Result<()> {
        self.modify(|doc| {
            doc.processing_history.push(ProcessingStep {
                timestamp: Utc::now(),
                command: command.to_string(),
            });
        })
    }
}
