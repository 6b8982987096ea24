use crate::diversion::DiversionTable;
use hec_core::{CouplingError, FarmId, Result};
use hec_raster::WaterUserMask;
use log::{debug, warn};
use ndarray::Array2;
use std::collections::{BTreeMap, HashSet};

/// Applied irrigation per grid cell on one date.
///
/// Each farm spreads its total diversion evenly over the cells it owns in
/// the water-user mask that carry an irrigated land-use class. Cells of no
/// irrigating farm hold 0.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplementalIrrigationMap {
    cells: Array2<f64>,
    /// Irrigated cell count per farm
    counts: BTreeMap<FarmId, usize>,
}

impl SupplementalIrrigationMap {
    pub fn compute(
        mask: &WaterUserMask,
        land_use: &Array2<i64>,
        irrigated_classes: &[i64],
        table: &DiversionTable,
    ) -> Result<Self> {
        let (rows, cols) = mask.shape();
        let (lu_rows, lu_cols) = land_use.dim();
        if (rows, cols) != (lu_rows, lu_cols) {
            return Err(CouplingError::ShapeMismatch {
                er: rows,
                ec: cols,
                ar: lu_rows,
                ac: lu_cols,
            });
        }

        let classes: HashSet<i64> = irrigated_classes.iter().copied().collect();
        let farms: HashSet<FarmId> = table.farm_ids.iter().copied().collect();
        let irrigated = |owner: i64, class: i64| {
            owner != mask.fill() && farms.contains(&owner) && classes.contains(&class)
        };

        let mut counts: BTreeMap<FarmId, usize> = BTreeMap::new();
        for (owner, class) in mask.array().iter().zip(land_use.iter()) {
            if irrigated(*owner, *class) {
                *counts.entry(*owner).or_insert(0) += 1;
            }
        }

        let mut rates: BTreeMap<FarmId, f64> = BTreeMap::new();
        for farm_id in &table.farm_ids {
            let applied = table.farm_total(*farm_id).unwrap_or(0.0);
            match counts.get(farm_id) {
                Some(&n) if n > 0 => {
                    rates.insert(*farm_id, applied / n as f64);
                    debug!("farm {} spreads {} over {} cells", farm_id, applied, n);
                }
                _ if applied != 0.0 => warn!(
                    "farm {} diverts {} on {} but owns no irrigated cell, dropping it",
                    farm_id, applied, table.date
                ),
                _ => {}
            }
        }

        let mut cells = Array2::<f64>::zeros((rows, cols));
        ndarray::Zip::from(&mut cells)
            .and(mask.array())
            .and(land_use)
            .for_each(|cell, owner, class| {
                if irrigated(*owner, *class) {
                    if let Some(rate) = rates.get(owner) {
                        *cell = *rate;
                    }
                }
            });

        Ok(SupplementalIrrigationMap { cells, counts })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get((row, col)).copied()
    }

    pub fn array(&self) -> &Array2<f64> {
        &self.cells
    }

    pub fn into_array(self) -> Array2<f64> {
        self.cells
    }

    /// Number of irrigated cells owned by `farm_id`.
    pub fn irrigated_cells(&self, farm_id: FarmId) -> usize {
        self.counts.get(&farm_id).copied().unwrap_or(0)
    }

    /// Total water applied over the grid.
    pub fn total(&self) -> f64 {
        self.cells.sum()
    }
}
