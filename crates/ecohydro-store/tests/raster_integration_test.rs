use ecohydro_core::config::{CliConfigOverrides, LayeredConfig};
use ecohydro_core::{Crs, EcohydroError, LinearUnit};
use ecohydro_geo::BoundingBox;
use ecohydro_store::raster::{self, ResampleMethod, ResampleOptions};
use ecohydro_store::GdalTools;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

struct Fixture {
    columns: u32,
    rows: u32,
    origin: (f64, f64),
    pixel_size: f64,
    geo_keys: Vec<u16>,
    /// Written as ModelTransformation in place of scale and tiepoint
    transformation: Option<[f64; 16]>,
}

impl Fixture {
    /// WGS84 / UTM zone 18N, 30 m pixels
    fn utm() -> Self {
        Self {
            columns: 10,
            rows: 8,
            origin: (350_000.0, 4_350_000.0),
            pixel_size: 30.0,
            geo_keys: geo_key_directory(&[(1024, 1), (1025, 1), (3072, 32618), (3076, 9001)]),
            transformation: None,
        }
    }

    /// The UTM grid expressed as a ModelTransformation with a positive y scale
    fn utm_positive_y_scale() -> Self {
        let (x, y) = (350_000.0, 4_350_000.0);
        Self {
            transformation: Some([
                30.0, 0.0, 0.0, x, //
                0.0, 30.0, 0.0, y, //
                0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ]),
            ..Self::utm()
        }
    }

    /// Geographic WGS84 covering (-76.8, 39.2, -76.6, 39.4)
    fn geographic() -> Self {
        Self {
            columns: 20,
            rows: 20,
            origin: (-76.8, 39.4),
            pixel_size: 0.01,
            geo_keys: geo_key_directory(&[(1024, 2), (1025, 1), (2048, 4326)]),
            transformation: None,
        }
    }

    fn write(&self, path: &Path) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(self.columns, self.rows)
            .unwrap();

        if let Some(transformation) = &self.transformation {
            image.encoder().write_tag(Tag::Unknown(34264), &transformation[..]).unwrap();
        } else {
            let scale = [self.pixel_size, self.pixel_size, 0.0];
            let tiepoint = [0.0, 0.0, 0.0, self.origin.0, self.origin.1, 0.0];
            image.encoder().write_tag(Tag::Unknown(33550), &scale[..]).unwrap();
            image.encoder().write_tag(Tag::Unknown(33922), &tiepoint[..]).unwrap();
        }
        image.encoder().write_tag(Tag::Unknown(34735), &self.geo_keys[..]).unwrap();

        let data = vec![1.0f32; (self.columns * self.rows) as usize];
        image.write_data(&data).unwrap();
    }
}

fn geo_key_directory(keys: &[(u16, u16)]) -> Vec<u16> {
    let mut directory = vec![1, 1, 0, keys.len() as u16];
    for &(key, value) in keys {
        directory.extend([key, 0, 1, value]);
    }
    directory
}

fn tools(warp: Option<PathBuf>, translate: Option<PathBuf>) -> GdalTools {
    let mut config = LayeredConfig::with_defaults();
    config.update_from_cli(CliConfigOverrides {
        gdal_warp: warp,
        gdal_translate: translate,
        ..Default::default()
    });
    GdalTools::from_config(config)
}

#[test]
fn test_describe_projected_geotiff() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("DEM.tif");
    Fixture::utm().write(&path);

    let descriptor = raster::describe(&path).unwrap();
    assert_eq!((descriptor.columns, descriptor.rows), (10, 8));
    assert_eq!(descriptor.pixel_width, 30.0);
    assert_eq!(descriptor.pixel_height, 30.0);
    assert_eq!(descriptor.crs, Crs::from_epsg(32618).unwrap());
    assert_eq!(descriptor.linear_unit, LinearUnit::metre());
    assert_eq!(descriptor.extent(), (350_000.0, 4_349_760.0, 350_300.0, 4_350_000.0));

    assert_eq!(raster::dimensions(&path).unwrap(), (10, 8));
}

#[test]
fn test_describe_geographic_geotiff() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("soil.tif");
    Fixture::geographic().write(&path);

    let descriptor = raster::describe(&path).unwrap();
    assert_eq!(descriptor.crs, Crs::wgs84());
    assert_eq!(descriptor.linear_unit, LinearUnit::unknown());

    let bbox = raster::bounding_box_of(&path).unwrap();
    assert!(bbox.is_wgs84());
    assert!((bbox.min_x() - -76.8).abs() < 1e-9);
    assert!((bbox.min_y() - 39.2).abs() < 1e-9);
    assert!((bbox.max_x() - -76.6).abs() < 1e-9);
    assert!((bbox.max_y() - 39.4).abs() < 1e-9);
}

#[test]
fn test_pixel_is_point_origin() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("points.tif");
    let mut fixture = Fixture::utm();
    fixture.geo_keys = geo_key_directory(&[(1024, 1), (1025, 2), (3072, 32618)]);
    fixture.write(&path);

    let descriptor = raster::describe(&path).unwrap();
    assert_eq!(descriptor.geo_transform.origin_x(), 349_985.0);
    assert_eq!(descriptor.geo_transform.origin_y(), 4_350_015.0);
}

#[test]
fn test_projected_bounding_box_is_wgs84() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("DEM.tif");
    Fixture::utm().write(&path);

    let bbox = raster::bounding_box_of(&path).unwrap();
    assert!(bbox.is_wgs84());
    // Zone 18N central meridian is -75; easting 350 km lies west of it
    assert!(bbox.min_x() > -77.0 && bbox.max_x() < -76.5);
    assert!(bbox.min_y() > 39.0 && bbox.max_y() < 39.5);
}

#[test]
fn test_describe_rejects_plain_tiff() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("plain.tif");
    let mut fixture = Fixture::utm();
    fixture.geo_keys = geo_key_directory(&[(1024, 1), (3072, 32767)]);
    fixture.write(&path);

    assert!(matches!(raster::describe(&path), Err(EcohydroError::Unreadable { .. })));
    assert!(matches!(
        raster::describe(&temp.path().join("missing.tif")),
        Err(EcohydroError::Unreadable { .. })
    ));
}

#[test]
fn test_resample_validates_resolution_before_tools() {
    let temp = TempDir::new().unwrap();
    let options = ResampleOptions::new(Crs::from_epsg(32618).unwrap(), 0.0, 30.0);

    let result = raster::resample(
        &tools(None, None),
        temp.path(),
        &temp.path().join("missing.tif"),
        "DEM_utm.tif",
        &options,
    );
    assert!(matches!(result, Err(EcohydroError::InvalidParameter { .. })));
}

#[test]
fn test_resample_requires_configured_tool() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("DEM.tif");
    Fixture::utm().write(&input);
    let options = ResampleOptions::new(Crs::from_epsg(32618).unwrap(), 10.0, 10.0);

    let result = raster::resample(&tools(None, None), temp.path(), &input, "DEM_10m.tif", &options);
    assert!(matches!(result, Err(EcohydroError::ConfigMissing { .. })));
}

#[test]
fn test_delete_geotiff_twice() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("DEM.tif");
    Fixture::utm().write(&path);
    fs::write(temp.path().join("DEM.tif.aux.xml"), "<PAMDataset/>").unwrap();

    raster::delete_geotiff(&path).unwrap();
    assert!(!path.exists());
    assert!(!temp.path().join("DEM.tif.aux.xml").exists());
    raster::delete_geotiff(&path).unwrap();
}

#[cfg(unix)]
mod with_fake_tools {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;

    /// Shell script that logs its arguments and writes its last argument
    fn fake_tool(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let log = dir.join(format!("{}.log", name));
        let body = format!(
            "#!/bin/sh\necho \"$@\" >> '{}'\nfor last; do :; done\necho {} > \"$last\"\n",
            log.display(),
            name
        );
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn log_of(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(format!("{}.log", name))).unwrap_or_default()
    }

    #[test]
    #[serial]
    fn test_resample_runs_gdalwarp_once() {
        let bin = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let input = project.path().join("DEM.tif");
        Fixture::utm().write(&input);

        let gdal = tools(Some(fake_tool(bin.path(), "gdalwarp")), None);
        let options = ResampleOptions::new(Crs::from_epsg(32618).unwrap(), 10.0, 10.0)
            .with_source_crs(Crs::from_epsg(32618).unwrap())
            .with_method(ResampleMethod::Cubic);

        let output = raster::resample(&gdal, project.path(), &input, "DEM_10m.tif", &options).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap().trim(), "gdalwarp");

        let log = log_of(bin.path(), "gdalwarp");
        assert!(log.starts_with("-q -s_srs EPSG:32618 -t_srs EPSG:32618 -tr 10 10 -r cubic"));
        assert!(log.contains("-of GTiff -co COMPRESS=LZW"));

        // Second call finds the output and neither runs nor needs the tool
        let modified = fs::metadata(&output).unwrap().modified().unwrap();
        let again = raster::resample(&tools(None, None), project.path(), &input, "DEM_10m.tif", &options)
            .unwrap();
        assert_eq!(again.file_name(), output.file_name());
        assert_eq!(fs::metadata(&output).unwrap().modified().unwrap(), modified);
        assert_eq!(log_of(bin.path(), "gdalwarp").lines().count(), 1);
    }

    #[test]
    #[serial]
    fn test_clip_by_bounding_box_projwin() {
        let bin = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        Fixture::geographic().write(&project.path().join("soil_full.tif"));

        let gdal = tools(None, Some(fake_tool(bin.path(), "gdal_translate")));
        let bbox = BoundingBox::wgs84(-76.75, 39.25, -76.65, 39.35).unwrap();
        raster::clip_by_bounding_box(&gdal, project.path(), "soil_full.tif", "soil.tif", &bbox).unwrap();

        let log = log_of(bin.path(), "gdal_translate");
        assert!(log.starts_with("-q -stats -of GTiff -co COMPRESS=LZW -projwin -76.75 39.35 -76.65 39.25"));
        assert!(project.path().join("soil.tif").exists());
    }

    #[test]
    #[serial]
    fn test_clip_by_reference_extent_uses_extent_grid() {
        let bin = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let extent = project.path().join("DEM.tif");
        let input = project.path().join("soil_full.tif");
        Fixture::utm().write(&extent);
        Fixture::geographic().write(&input);

        let gdal = tools(Some(fake_tool(bin.path(), "gdalwarp")), None);
        raster::clip_by_reference_extent(
            &gdal,
            project.path(),
            &extent,
            &input,
            "soil.tif",
            ResampleMethod::Near,
        )
        .unwrap();

        let log = log_of(bin.path(), "gdalwarp");
        assert!(log.starts_with(
            "-s_srs EPSG:4326 -t_srs EPSG:32618 -te 350000 4349760 350300 4350000 -tr 30 30 -r near"
        ));
    }

    #[test]
    #[serial]
    fn test_clip_by_reference_extent_unsigned_resolution() {
        let bin = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let extent = project.path().join("DEM.tif");
        let input = project.path().join("soil_full.tif");
        Fixture::utm_positive_y_scale().write(&extent);
        Fixture::geographic().write(&input);

        let gdal = tools(Some(fake_tool(bin.path(), "gdalwarp")), None);
        raster::clip_by_reference_extent(
            &gdal,
            project.path(),
            &extent,
            &input,
            "soil.tif",
            ResampleMethod::Near,
        )
        .unwrap();

        let log = log_of(bin.path(), "gdalwarp");
        assert!(log.contains("-te 350000 4349760 350300 4350000 -tr 30 30 -r near"));
    }

    #[test]
    #[serial]
    fn test_copy_to_geotiff_reports_tool_failure() {
        let bin = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let input = project.path().join("DEM.img");
        Fixture::utm().write(&input);

        let failing = bin.path().join("gdal_translate");
        fs::write(&failing, "#!/bin/sh\necho 'ERROR 4: not recognized' >&2\nexit 1\n").unwrap();
        fs::set_permissions(&failing, fs::Permissions::from_mode(0o755)).unwrap();

        let result = raster::copy_to_geotiff(&tools(None, Some(failing)), project.path(), &input, "DEM.tif");
        match result {
            Err(EcohydroError::ExternalToolFailure { exit_code, stderr, .. }) => {
                assert_eq!(exit_code, Some(1));
                assert!(stderr.contains("not recognized"));
            }
            other => panic!("expected tool failure, got {:?}", other),
        }
    }
}
