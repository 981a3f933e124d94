use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// Ecohydro - Spatial data acquisition for ecohydrology study areas
#[derive(Parser, Debug)]
#[command(name = "ecohydro")]
#[command(about = "Spatial data acquisition for ecohydrology study areas", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to $ECOHYDRO_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path of the gdalwarp executable
    #[arg(long, global = true, value_name = "PATH")]
    pub gdal_warp: Option<PathBuf>,

    /// Path of the gdal_translate executable
    #[arg(long, global = true, value_name = "PATH")]
    pub gdal_translate: Option<PathBuf>,

    /// Path of the ogr2ogr executable
    #[arg(long, global = true, value_name = "PATH")]
    pub ogr2ogr: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Define the study area of a project from a bounding box or a shapefile
    StudyArea(StudyAreaArgs),

    /// Register the streamflow gage of the study area
    RegisterGage(RegisterGageArgs),

    /// Reproject and resample a downloaded DEM into the project
    ImportDem(ImportDemArgs),

    /// Convert downloaded soil features into the DEM's CRS
    ImportSoil(ImportSoilArgs),

    /// Bounding box calculations
    Bbox(BboxArgs),

    /// Show the metadata of a GeoTIFF
    RasterInfo(RasterInfoArgs),

    /// Show the effective configuration and where each value came from
    Config,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["bbox", "shapefile"])))]
pub struct StudyAreaArgs {
    /// Project directory
    #[arg(short = 'p', long)]
    pub project_dir: PathBuf,

    /// Bounding box as "minX minY maxX maxY" in WGS84
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<String>,

    /// Shapefile whose features define the study area
    #[arg(long)]
    pub shapefile: Option<PathBuf>,

    /// Degrees added around the shapefile extent
    #[arg(long, default_value_t = 0.01)]
    pub buffer: f64,

    /// Seed the extent with {0, 90, -180, 0} like older projects did
    #[arg(long)]
    pub legacy_union: bool,

    /// Name of the study-area polygon layer
    #[arg(short = 'f', long, default_value = "studyarea")]
    pub outfile: String,

    /// Replace an existing study-area layer
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Parser, Debug)]
pub struct RegisterGageArgs {
    /// Project directory
    #[arg(short = 'p', long)]
    pub project_dir: PathBuf,

    /// Shapefile containing gage locations
    #[arg(short = 'g', long)]
    pub gage_file: PathBuf,

    /// Layer name within the gage shapefile
    #[arg(short = 'l', long)]
    pub layer_name: String,

    /// Attribute identifying each gage
    #[arg(short = 'a', long)]
    pub id_attribute: String,

    /// Identifier of the gage to register
    #[arg(short = 'd', long)]
    pub id_value: String,

    /// Name of the gage layer written to the project
    #[arg(short = 'f', long, default_value = "gage")]
    pub outfile: String,
}

#[derive(Parser, Debug)]
pub struct ImportDemArgs {
    /// Project directory
    #[arg(short = 'p', long)]
    pub project_dir: PathBuf,

    /// Raw DEM as downloaded
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Name of the DEM written to the project, without extension
    #[arg(short = 'f', long, default_value = "DEM")]
    pub outfile: String,

    /// Output resolution in target CRS units
    #[arg(short = 's', long, num_args = 2, required = true, value_names = ["RES_X", "RES_Y"])]
    pub resolution: Vec<f64>,

    /// Target CRS (defaults to the UTM zone of the study area)
    #[arg(short = 't', long)]
    pub t_srs: Option<String>,

    /// CRS of the raw DEM when it is not embedded in the file
    #[arg(long)]
    pub s_srs: Option<String>,

    /// Resampling method
    #[arg(short = 'r', long, default_value = "bilinear")]
    pub method: String,

    /// Delete the raw DEM once imported
    #[arg(long)]
    pub delete_input: bool,
}

#[derive(Parser, Debug)]
pub struct ImportSoilArgs {
    /// Project directory
    #[arg(short = 'p', long)]
    pub project_dir: PathBuf,

    /// Soil features as downloaded (GML)
    #[arg(short = 'g', long)]
    pub gml: PathBuf,

    /// Name of the soil layer written to the project
    #[arg(short = 'f', long, default_value = "soil")]
    pub outfile: String,
}

#[derive(Parser, Debug)]
pub struct BboxArgs {
    #[command(subcommand)]
    pub command: BboxCommands,
}

#[derive(Subcommand, Debug)]
pub enum BboxCommands {
    /// Geodesic area in square metres
    Area {
        /// "minX minY maxX maxY"
        #[arg(allow_hyphen_values = true)]
        bbox: String,
    },

    /// Centre of the box
    Center {
        #[arg(allow_hyphen_values = true)]
        bbox: String,
    },

    /// UTM zone and EPSG code of the box centre
    Utm {
        #[arg(allow_hyphen_values = true)]
        bbox: String,
    },

    /// Whether the box contains a point
    Contains {
        #[arg(allow_hyphen_values = true)]
        bbox: String,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(allow_hyphen_values = true)]
        lat: f64,
    },

    /// Grow the box by a number of degrees
    Buffer {
        #[arg(allow_hyphen_values = true)]
        bbox: String,
        #[arg(long)]
        degrees: f64,
    },

    /// Split the box into tiles no larger than a threshold area
    Tile {
        #[arg(allow_hyphen_values = true)]
        bbox: String,
        /// Maximum tile area in square metres
        #[arg(long)]
        threshold: f64,
    },
}

#[derive(Parser, Debug)]
pub struct RasterInfoArgs {
    /// GeoTIFF to describe
    pub path: PathBuf,
}
