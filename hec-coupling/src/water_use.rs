use hec_core::farm::WaterUser;
use hec_core::{FarmId, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Simulated water use per farm and crop, as delivered by the economic
/// model after a scenario run.
///
/// Serialized as a map from farm id to per-crop volumes:
/// `{ "7": [120.5, 0.0], "8": [64.0] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaterUse {
    per_farm: BTreeMap<FarmId, Vec<f64>>,
}

impl WaterUse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-crop volumes of one farm.
    pub fn insert(&mut self, farm_id: FarmId, per_crop: Vec<f64>) {
        self.per_farm.insert(farm_id, per_crop);
    }

    pub fn get(&self, farm_id: FarmId) -> Option<&[f64]> {
        self.per_farm.get(&farm_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.per_farm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_farm.is_empty()
    }

    /// Collect `watersim` of every farm that has one.
    pub fn from_farms<F: WaterUser>(farms: &[F]) -> Self {
        farms
            .iter()
            .filter_map(|f| f.water_sim().map(|ws| (f.id(), ws.to_vec())))
            .collect()
    }

    pub fn parse_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_json(&text)
    }
}

impl FromIterator<(FarmId, Vec<f64>)> for WaterUse {
    fn from_iter<I: IntoIterator<Item = (FarmId, Vec<f64>)>>(iter: I) -> Self {
        WaterUse {
            per_farm: iter.into_iter().collect(),
        }
    }
}
