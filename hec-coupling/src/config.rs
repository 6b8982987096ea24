use hec_core::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Allocator settings.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```json
/// { "allow_shared_nodes": false, "irrigated_classes": [82] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Whether several farms may divert from the same node.
    pub allow_shared_nodes: bool,
    /// Mask value of cells no water user claims.
    pub fill_value: i64,
    /// Polygon property holding the farm id.
    pub water_user_id_field: String,
    /// Land-use classes that receive supplemental irrigation.
    pub irrigated_classes: Vec<i64>,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        AllocatorConfig {
            allow_shared_nodes: true,
            fill_value: hec_raster::DEFAULT_FILL,
            water_user_id_field: "id".to_string(),
            irrigated_classes: Vec::new(),
        }
    }
}

impl AllocatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
