use anyhow::Context;
use hec_coupling::{export_farms, load_farms};
use log::info;

/// Read farm records and write them back as a `{"farms": [...]}` snapshot.
pub fn run_export(farms: &str, output: &str) -> anyhow::Result<()> {
    let records = load_farms(farms).with_context(|| format!("Failed to read farms {}", farms))?;
    let written = export_farms(&records, output).with_context(|| format!("Failed to write {}", output))?;
    info!("Export complete. {} farms written to {}", written, output);
    Ok(())
}
