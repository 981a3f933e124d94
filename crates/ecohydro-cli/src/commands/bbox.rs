//! Bbox command implementation

use crate::cli::{BboxArgs, BboxCommands};
use crate::output::OutputWriter;
use crate::output_types::{
    AreaOutput, BufferOutput, CenterOutput, ContainsOutput, TileOutput, UtmOutput,
};
use anyhow::{Context, Result};
use ecohydro_geo::{bbox, utm_zone_for, BoundingBox};

fn parse(wire: &str) -> Result<BoundingBox> {
    wire.parse().with_context(|| format!("Invalid bounding box '{}'", wire))
}

pub fn execute(args: &BboxArgs, output: &OutputWriter) -> Result<()> {
    match &args.command {
        BboxCommands::Area { bbox: wire } => {
            let area_sq_meters = bbox::area_sq_meters(&parse(wire)?)?;
            output.result("Area", &AreaOutput { bbox: wire.clone(), area_sq_meters })
        }
        BboxCommands::Center { bbox: wire } => {
            let (lon, lat) = bbox::center(&parse(wire)?);
            output.result("Center", &CenterOutput { lon, lat })
        }
        BboxCommands::Utm { bbox: wire } => {
            let (lon, lat) = bbox::center(&parse(wire)?);
            let zone = utm_zone_for(lon, lat)?;
            output.result(
                "UTM zone",
                &UtmOutput {
                    zone: zone.zone,
                    hemisphere: if zone.is_north { "north" } else { "south" },
                    crs: zone.crs()?.to_string(),
                },
            )
        }
        BboxCommands::Contains { bbox: wire, lon, lat } => {
            let contained = bbox::contains(&parse(wire)?, *lon, *lat)?;
            output.result("Contains", &ContainsOutput { lon: *lon, lat: *lat, contained })
        }
        BboxCommands::Buffer { bbox: wire, degrees } => {
            let buffered = bbox::buffer(&parse(wire)?, *degrees)?;
            output.result(
                "Buffer",
                &BufferOutput {
                    bbox: wire.clone(),
                    degrees: *degrees,
                    buffered: buffered.to_wire_string(),
                },
            )
        }
        BboxCommands::Tile { bbox: wire, threshold } => {
            let tiles = bbox::tile(&parse(wire)?, *threshold)?;
            if !output.is_json() {
                output.section(format!("{} tile(s)", tiles.len()));
                for (index, tile) in tiles.iter().enumerate() {
                    output.kv(index + 1, tile.to_wire_string());
                }
                return Ok(());
            }
            output.result(
                "Tiles",
                &TileOutput {
                    threshold_sq_meters: *threshold,
                    tiles: tiles.iter().map(BoundingBox::to_wire_string).collect(),
                },
            )
        }
    }
}
