//! External GDAL/OGR command-line tools

use ecohydro_core::config::LayeredConfig;
use ecohydro_core::error::{EcohydroError, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A verified executable on disk
#[derive(Debug, Clone)]
pub struct ExternalTool {
    name: String,
    path: PathBuf,
}

/// Captured output of a successful run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ExternalTool {
    /// Verify that `path` names an executable file
    pub fn locate(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|_| EcohydroError::ExecutableNotFound {
            path: path.to_path_buf(),
        })?;

        if !metadata.is_file() || !is_executable(&metadata) {
            return Err(EcohydroError::ExecutableNotFound { path: path.to_path_buf() });
        }

        Ok(Self { name: name.into(), path: path.to_path_buf() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the tool with `args`, blocking until it exits.
    ///
    /// Arguments are passed straight to the process; no shell is involved.
    pub fn run<I, S>(&self, args: I) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let command_line = self.command_line(&args);
        tracing::debug!("Running {}", command_line);

        let output = Command::new(&self.path).args(&args).output().map_err(|e| {
            EcohydroError::ExternalToolFailure {
                command: command_line.clone(),
                exit_code: None,
                stderr: e.to_string(),
            }
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(EcohydroError::ExternalToolFailure {
                command: command_line,
                exit_code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(ToolOutput { stdout: String::from_utf8_lossy(&output.stdout).into_owned(), stderr })
    }

    fn command_line<S: AsRef<OsStr>>(&self, args: &[S]) -> String {
        std::iter::once(self.name.clone())
            .chain(args.iter().map(|a| {
                let arg = a.as_ref().to_string_lossy();
                if arg.is_empty() || arg.contains(char::is_whitespace) {
                    format!("\"{}\"", arg)
                } else {
                    arg.into_owned()
                }
            }))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    true
}

/// The GDAL/OGR tools named in configuration.
///
/// Each accessor resolves its tool on demand, so an operation only needs
/// the tools it actually runs.
#[derive(Debug, Clone)]
pub struct GdalTools {
    config: LayeredConfig,
}

impl GdalTools {
    pub fn from_config(config: LayeredConfig) -> Self {
        Self { config }
    }

    pub fn gdal_warp(&self) -> Result<ExternalTool> {
        ExternalTool::locate("gdalwarp", self.config.require_gdal_warp()?)
    }

    pub fn gdal_translate(&self) -> Result<ExternalTool> {
        ExternalTool::locate("gdal_translate", self.config.require_gdal_translate()?)
    }

    pub fn ogr2ogr(&self) -> Result<ExternalTool> {
        ExternalTool::locate("ogr2ogr", self.config.require_ogr2ogr()?)
    }
}
