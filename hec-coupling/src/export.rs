//! `{ "farms": [...] }` snapshots of the water users an allocator serves.

use hec_core::farm::{Farm, WaterUser};
use hec_core::Result;
use serde::Serialize;
use std::io::BufWriter;
use std::path::Path;

#[derive(Serialize)]
struct FarmsSnapshot {
    farms: Vec<serde_json::Value>,
}

/// Write the model-facing state of `farms` to `path`. Returns the number of
/// farms written.
pub fn export_farms<'a, F, I, P>(farms: I, path: P) -> Result<usize>
where
    F: WaterUser + 'a,
    I: IntoIterator<Item = &'a F>,
    P: AsRef<Path>,
{
    let snapshot = FarmsSnapshot {
        farms: farms.into_iter().map(WaterUser::state).collect(),
    };
    let file = std::fs::File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(file), &snapshot)?;
    log::info!(
        "exported {} farms to {}",
        snapshot.farms.len(),
        path.as_ref().display()
    );
    Ok(snapshot.farms.len())
}

/// Read farm records written by [`export_farms`] or produced by the
/// economic model.
pub fn load_farms<P: AsRef<Path>>(path: P) -> Result<Vec<Farm>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let farms = Farm::parse_farms_json(&text)?;
    log::debug!("loaded {} farms from {}", farms.len(), path.as_ref().display());
    Ok(farms)
}
