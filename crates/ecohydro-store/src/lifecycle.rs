//! File lifecycle helpers: idempotence guard, sidecar-aware deletion and
//! filesystem preconditions.
//!
//! The existence check is not a lock. Two processes writing the same
//! output path race; drivers are expected to run one after another.

use ecohydro_core::error::{EcohydroError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Sidecar extensions of an ESRI shapefile
pub const SHAPEFILE_SIDECARS: &[&str] = &["shx", "dbf", "prj", "cpg", "qix"];

/// Sidecar extensions of a GeoTIFF
pub const GEOTIFF_SIDECARS: &[&str] = &["tif.aux.xml"];

/// Skip-if-present guard used before every expensive conversion
pub fn exists_idempotent(path: &Path) -> bool {
    if path.exists() {
        tracing::debug!("{} already exists, skipping", path.display());
        true
    } else {
        false
    }
}

/// Remove a primary artifact and every sidecar sharing its stem.
///
/// Files that are already gone are not an error. Returns the paths that
/// were actually removed.
pub fn delete_artifact_group(primary: &Path, sidecar_extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let candidates = std::iter::once(primary.to_path_buf())
        .chain(sidecar_extensions.iter().map(|ext| primary.with_extension(ext)));

    let mut removed = Vec::new();
    for path in candidates {
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(EcohydroError::Io(e)),
        }
    }

    if !removed.is_empty() {
        tracing::debug!("Removed {} file(s) of {}", removed.len(), primary.display());
    }
    Ok(removed)
}

/// Check that `path` is a writable directory and return its absolute form
pub fn ensure_writable_dir(path: &Path) -> Result<PathBuf> {
    let metadata = fs::metadata(path).map_err(|_| EcohydroError::NotADirectory {
        path: path.to_path_buf(),
    })?;

    if !metadata.is_dir() {
        return Err(EcohydroError::NotADirectory { path: path.to_path_buf() });
    }

    // Permission bits say nothing about the current user, so try a write
    let marker = path.join(format!(".ecohydro-write-check-{}", std::process::id()));
    match fs::OpenOptions::new().write(true).create_new(true).open(&marker) {
        Ok(_) => fs::remove_file(&marker)?,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
        Err(e) => {
            return Err(EcohydroError::PermissionDenied {
                path: path.to_path_buf(),
                reason: format!("directory is not writable: {}", e),
            })
        }
    }

    Ok(fs::canonicalize(path)?)
}

/// Check that `path` is a regular file that can be opened for reading
pub fn ensure_readable_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(EcohydroError::Unreadable {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    fs::File::open(path).map_err(|e| EcohydroError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}
