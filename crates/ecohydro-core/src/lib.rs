//! Ecohydro Core - Error taxonomy, CRS identifiers, configuration, and project metadata
//!
//! This crate contains the domain types and port definitions shared by the
//! spatial-data utility crates and the command-line drivers.

pub mod config;
pub mod error;
pub mod metadata;
pub mod models;
pub mod ports;

pub use error::{EcohydroError, Result};
pub use metadata::TomlMetadataStore;
pub use models::{Crs, LinearUnit};
pub use ports::MetadataStore;
