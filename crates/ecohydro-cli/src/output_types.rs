use ecohydro_core::config::ConfigSource;
use serde::Serialize;

/// Output for study-area command
#[derive(Debug, Serialize)]
pub struct StudyAreaOutput {
    pub bbox_wgs84: String,
    pub shapefile: String,
    pub area_sq_km: f64,
}

/// Output for register-gage command
#[derive(Debug, Serialize)]
pub struct RegisterGageOutput {
    pub gage: String,
    pub gage_id_attr: String,
    pub gage_id: String,
    pub gage_lon_wgs84: f64,
    pub gage_lat_wgs84: f64,
}

/// Output for import-dem command
#[derive(Debug, Serialize)]
pub struct ImportDemOutput {
    pub dem: String,
    pub dem_srs: String,
    pub dem_res_x: f64,
    pub dem_res_y: f64,
    pub dem_columns: u32,
    pub dem_rows: u32,
    pub input_deleted: bool,
}

/// Output for import-soil command
#[derive(Debug, Serialize)]
pub struct ImportSoilOutput {
    pub soil_features: String,
    pub srs: String,
}

/// Output for bbox area command
#[derive(Debug, Serialize)]
pub struct AreaOutput {
    pub bbox: String,
    pub area_sq_meters: f64,
}

/// Output for bbox center command
#[derive(Debug, Serialize)]
pub struct CenterOutput {
    pub lon: f64,
    pub lat: f64,
}

/// Output for bbox utm command
#[derive(Debug, Serialize)]
pub struct UtmOutput {
    pub zone: u32,
    pub hemisphere: &'static str,
    pub crs: String,
}

/// Output for bbox contains command
#[derive(Debug, Serialize)]
pub struct ContainsOutput {
    pub lon: f64,
    pub lat: f64,
    pub contained: bool,
}

/// Output for bbox buffer command
#[derive(Debug, Serialize)]
pub struct BufferOutput {
    pub bbox: String,
    pub degrees: f64,
    pub buffered: String,
}

/// Output for bbox tile command
#[derive(Debug, Serialize)]
pub struct TileOutput {
    pub threshold_sq_meters: f64,
    pub tiles: Vec<String>,
}

/// Output for raster-info command
#[derive(Debug, Serialize)]
pub struct RasterInfoOutput {
    pub path: String,
    pub columns: u32,
    pub rows: u32,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub crs: String,
    pub crs_definition: Option<String>,
    pub linear_unit: String,
    pub meters_per_unit: f64,
    pub bbox_wgs84: String,
}

/// One entry of the config command
#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: ConfigSource,
}
