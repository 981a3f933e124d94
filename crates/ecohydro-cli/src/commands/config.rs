//! Config command implementation

use crate::cli::Cli;
use crate::config_loader;
use crate::output::OutputWriter;
use crate::output_types::ConfigEntry;
use anyhow::Result;

pub fn execute(cli: &Cli, output: &OutputWriter) -> Result<()> {
    let config = config_loader::load_config(cli)?;

    let mut entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry { key, value, source })
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    if output.is_json() {
        return output.result("Configuration", &entries);
    }

    output.section("Configuration");
    for entry in &entries {
        output.kv(&entry.key, format!("{} ({:?})", entry.value, entry.source));
    }
    Ok(())
}
