use ecohydro_core::config::{CliConfigOverrides, LayeredConfig};
use ecohydro_core::{Crs, EcohydroError};
use ecohydro_store::{gml, GdalTools};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SOIL_GML: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<wfs:FeatureCollection xmlns:gml="http://www.opengis.net/gml" xmlns:wfs="http://www.opengis.net/wfs">
  <gml:boundedBy>
    <gml:Envelope srsName="EPSG:4326">
      <gml:lowerCorner>39.27 -76.77</gml:lowerCorner>
      <gml:upperCorner>39.33 -76.71</gml:upperCorner>
    </gml:Envelope>
  </gml:boundedBy>
</wfs:FeatureCollection>
"#;

fn tools(ogr2ogr: Option<PathBuf>) -> GdalTools {
    let mut config = LayeredConfig::with_defaults();
    config.update_from_cli(CliConfigOverrides { ogr2ogr, ..Default::default() });
    GdalTools::from_config(config)
}

fn write_gml(dir: &Path) -> PathBuf {
    let path = dir.join("soil.gml");
    fs::write(&path, SOIL_GML).unwrap();
    path
}

#[test]
fn test_convert_missing_gml_is_unreadable() {
    let project = TempDir::new().unwrap();
    let result = gml::convert_gml_to_shapefile(
        &tools(None),
        project.path(),
        &project.path().join("missing.gml"),
        "soil",
        &Crs::from_epsg(32618).unwrap(),
    );
    assert!(matches!(result, Err(EcohydroError::Unreadable { .. })));
}

#[test]
fn test_convert_without_ogr2ogr_is_config_missing() {
    let project = TempDir::new().unwrap();
    let input = write_gml(project.path());
    let result = gml::convert_gml_to_shapefile(
        &tools(None),
        project.path(),
        &input,
        "soil",
        &Crs::from_epsg(32618).unwrap(),
    );
    assert!(matches!(result, Err(EcohydroError::ConfigMissing { .. })));
}

#[cfg(unix)]
mod with_fake_tools {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;

    /// ogr2ogr stand-in: logs its arguments and writes the output path,
    /// which precedes the input as the second-to-last argument
    fn fake_ogr2ogr(dir: &Path) -> PathBuf {
        let path = dir.join("ogr2ogr");
        let body = format!(
            "#!/bin/sh\necho \"$@\" >> '{}'\nwhile [ $# -gt 2 ]; do shift; done\necho ogr2ogr > \"$1\"\n",
            dir.join("ogr2ogr.log").display()
        );
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn log_of(dir: &Path) -> String {
        fs::read_to_string(dir.join("ogr2ogr.log")).unwrap_or_default()
    }

    #[test]
    #[serial]
    fn test_convert_runs_ogr2ogr_once() {
        let bin = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let input = write_gml(project.path());
        let target = Crs::from_epsg(32618).unwrap();

        let name =
            gml::convert_gml_to_shapefile(&tools(Some(fake_ogr2ogr(bin.path()))), project.path(), &input, "soil", &target)
                .unwrap();
        assert_eq!(name, "soil.shp");

        let output = project.path().canonicalize().unwrap().join("soil.shp");
        assert_eq!(fs::read_to_string(&output).unwrap().trim(), "ogr2ogr");

        let log = log_of(bin.path());
        let expected = format!(
            "-f ESRI Shapefile -nln soil -t_srs EPSG:32618 {} {}",
            output.display(),
            input.display()
        );
        assert_eq!(log.trim(), expected);

        // Second call finds the shapefile and neither runs nor needs the tool
        let again = gml::convert_gml_to_shapefile(&tools(None), project.path(), &input, "soil", &target).unwrap();
        assert_eq!(again, "soil.shp");
        assert_eq!(log_of(bin.path()).lines().count(), 1);
    }

    #[test]
    #[serial]
    fn test_convert_reports_ogr2ogr_failure() {
        let bin = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let input = write_gml(project.path());

        let failing = bin.path().join("ogr2ogr");
        fs::write(&failing, "#!/bin/sh\necho 'FAILURE: Unable to open datasource' >&2\nexit 1\n").unwrap();
        fs::set_permissions(&failing, fs::Permissions::from_mode(0o755)).unwrap();

        let result = gml::convert_gml_to_shapefile(
            &tools(Some(failing)),
            project.path(),
            &input,
            "soil",
            &Crs::from_epsg(32618).unwrap(),
        );
        match result {
            Err(EcohydroError::ExternalToolFailure { exit_code, stderr, command }) => {
                assert_eq!(exit_code, Some(1));
                assert!(stderr.contains("Unable to open datasource"));
                assert!(command.contains("\"ESRI Shapefile\""));
            }
            other => panic!("expected tool failure, got {:?}", other),
        }
        assert!(!project.path().join("soil.shp").exists());
    }
}
