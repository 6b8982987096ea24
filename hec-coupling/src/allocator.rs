use crate::config::AllocatorConfig;
use crate::diversion::{DiversionSeries, DiversionTable};
use crate::export;
use crate::irrigation::SupplementalIrrigationMap;
use crate::matrix::FarmNodeMatrix;
use crate::water_use::WaterUse;
use chrono::NaiveDate;
use hec_core::farm::{CropSchedule, WaterUser};
use hec_core::feature::Feature;
use hec_core::grid::GridSpec;
use hec_core::{CouplingError, FarmId, Result};
use hec_crop::CropCoefficientCurve;
use hec_network::NetworkTopology;
use hec_raster::{WaterUserMask, WaterUserRasterizer};
use hec_utils::dates::DateRange;
use log::{debug, info, warn};
use ndarray::{Array2, Axis};
use std::collections::BTreeMap;
use std::path::Path;

/// Seasonal demand per crop of each attached farm: the sum of daily Kc over
/// the season, scaled by irrigation efficiency and the irrigation flag.
pub type AppliedWaterFactors = BTreeMap<FarmId, Vec<f64>>;

/// Lifecycle of a [`FarmWaterAllocator`]. States are ordered; an operation
/// accepts its required state or any later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AllocatorState {
    Unattached,
    FarmsAttached,
    MaskSet,
    FactorsComputed,
    Simulated,
}

impl AllocatorState {
    pub fn name(&self) -> &'static str {
        match self {
            AllocatorState::Unattached => "Unattached",
            AllocatorState::FarmsAttached => "FarmsAttached",
            AllocatorState::MaskSet => "MaskSet",
            AllocatorState::FactorsComputed => "FactorsComputed",
            AllocatorState::Simulated => "Simulated",
        }
    }
}

/// Turns simulated farm water use into river diversions and an irrigation
/// map.
///
/// One allocator serves one scenario. It borrows the network and the farms
/// for its whole life and owns everything it derives from them. Calling an
/// earlier step again rewinds the allocator to that step and drops whatever
/// was derived after it.
pub struct FarmWaterAllocator<'a, F: WaterUser> {
    curve: CropCoefficientCurve,
    rasterizer: WaterUserRasterizer,
    config: AllocatorConfig,
    state: AllocatorState,
    topology: Option<&'a NetworkTopology>,
    matrix: Option<FarmNodeMatrix<'a, F>>,
    mask: Option<WaterUserMask>,
    schedules: BTreeMap<FarmId, Vec<CropSchedule>>,
    factors: AppliedWaterFactors,
    water_use: Option<WaterUse>,
}

impl<'a, F: WaterUser> FarmWaterAllocator<'a, F> {
    pub fn new(curve: CropCoefficientCurve, grid: GridSpec, config: AllocatorConfig) -> Self {
        let rasterizer = WaterUserRasterizer::new(grid).with_fill(config.fill_value);
        FarmWaterAllocator {
            curve,
            rasterizer,
            config,
            state: AllocatorState::Unattached,
            topology: None,
            matrix: None,
            mask: None,
            schedules: BTreeMap::new(),
            factors: BTreeMap::new(),
            water_use: None,
        }
    }

    pub fn state(&self) -> AllocatorState {
        self.state
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub fn curve(&self) -> &CropCoefficientCurve {
        &self.curve
    }

    pub fn grid(&self) -> &GridSpec {
        self.rasterizer.grid()
    }

    pub fn topology(&self) -> Option<&'a NetworkTopology> {
        self.topology
    }

    pub fn farm_node_matrix(&self) -> Option<&FarmNodeMatrix<'a, F>> {
        self.matrix.as_ref()
    }

    pub fn water_user_mask(&self) -> Option<&WaterUserMask> {
        self.mask.as_ref()
    }

    /// Factors of the last [`Self::compute_applied_water_factors`] call.
    pub fn applied_water_factors(&self) -> Option<&AppliedWaterFactors> {
        (self.state >= AllocatorState::FactorsComputed).then_some(&self.factors)
    }

    pub fn water_use(&self) -> Option<&WaterUse> {
        self.water_use.as_ref()
    }

    /// Attach every farm to its source node in `topology`.
    pub fn attach_farms(&mut self, topology: &'a NetworkTopology, farms: &'a [F]) -> Result<()> {
        let matrix = FarmNodeMatrix::build(topology.nodes(), farms, self.config.allow_shared_nodes)?;
        self.topology = Some(topology);
        self.matrix = Some(matrix);
        self.mask = None;
        self.clear_factors();
        self.state = AllocatorState::FarmsAttached;
        Ok(())
    }

    /// Rasterize the water-user polygons, identified by `id_field`, onto the
    /// reference grid. The fill value must not be an attached farm's id.
    pub fn set_water_user_mask(&mut self, features: &[Feature], id_field: &str) -> Result<()> {
        self.require("set_water_user_mask", AllocatorState::FarmsAttached)?;
        let fill = self.config.fill_value;
        if self.attached_matrix("set_water_user_mask")?.farm_ids().contains(&fill) {
            return Err(CouplingError::FillValueCollision(fill));
        }
        let mask = self.rasterizer.rasterize(features, id_field)?;
        if let Some(matrix) = &self.matrix {
            for farm_id in matrix.farm_ids() {
                if mask.count(farm_id) == 0 {
                    debug!("farm {} owns no cell of the reference grid", farm_id);
                }
            }
        }
        self.mask = Some(mask);
        self.clear_factors();
        self.state = AllocatorState::MaskSet;
        Ok(())
    }

    /// Seasonal demand factor of every crop of every attached farm.
    pub fn compute_applied_water_factors(&mut self) -> Result<&AppliedWaterFactors> {
        self.require("compute_applied_water_factors", AllocatorState::MaskSet)?;
        let matrix = self.attached_matrix("compute_applied_water_factors")?;

        let mut schedules = BTreeMap::new();
        let mut factors = BTreeMap::new();
        for (_, _, farm) in matrix.attached() {
            let farm_schedules = farm
                .crop_schedule()?
                .ok_or_else(|| CouplingError::MissingCropSchedule(describe(farm)))?;
            let farm_factors = farm_schedules
                .iter()
                .map(|s| -> Result<f64> {
                    Ok(self.curve.seasonal_sum(s.start, s.cover, s.end, s.crop_id)? * s.irr_eff * s.irr)
                })
                .collect::<Result<Vec<f64>>>()?;
            debug!("farm {} applied water factors {:?}", farm.id(), farm_factors);
            schedules.insert(farm.id(), farm_schedules);
            factors.insert(farm.id(), farm_factors);
        }
        info!("computed applied water factors for {} farms", factors.len());

        self.schedules = schedules;
        self.factors = factors;
        self.water_use = None;
        self.state = AllocatorState::FactorsComputed;
        Ok(&self.factors)
    }

    /// Store the scenario's simulated water use. Every attached farm needs
    /// one volume per crop.
    pub fn record_simulation(&mut self, water_use: WaterUse) -> Result<()> {
        self.require("record_simulation", AllocatorState::FactorsComputed)?;
        let matrix = self.attached_matrix("record_simulation")?;
        for (_, _, farm) in matrix.attached() {
            let crops = farm.crop_ids().len();
            match water_use.get(farm.id()) {
                None => {
                    return Err(CouplingError::MissingWaterUse {
                        farm_id: farm.id(),
                        reason: "no simulated water use".to_string(),
                    })
                }
                Some(volumes) if volumes.len() != crops => {
                    return Err(CouplingError::MissingWaterUse {
                        farm_id: farm.id(),
                        reason: format!("{} volumes for {} crops", volumes.len(), crops),
                    })
                }
                Some(_) => {}
            }
        }
        info!("recorded simulated water use for {} farms", water_use.len());
        self.water_use = Some(water_use);
        self.state = AllocatorState::Simulated;
        Ok(())
    }

    /// Diversions of every farm and node on `date`.
    ///
    /// A crop diverts `watersim * Kc(date) / factor`, or nothing when its
    /// factor is 0.
    pub fn compute_diversions(&self, date: NaiveDate) -> Result<DiversionTable> {
        self.require("compute_diversions", AllocatorState::Simulated)?;
        let matrix = self.attached_matrix("compute_diversions")?;
        let water_use = self
            .water_use
            .as_ref()
            .ok_or_else(|| self.invalid_state("compute_diversions", AllocatorState::Simulated))?;

        let (rows, cols) = matrix.dim();
        let mut node_farm = Array2::<f64>::zeros((rows, cols));
        let mut per_crop = BTreeMap::new();
        for (row, col, farm) in matrix.attached() {
            let id = farm.id();
            let (Some(schedules), Some(factors), Some(volumes)) =
                (self.schedules.get(&id), self.factors.get(&id), water_use.get(id))
            else {
                return Err(CouplingError::MissingWaterUse {
                    farm_id: id,
                    reason: "farm was attached after factors were computed".to_string(),
                });
            };
            let crops = schedules
                .iter()
                .zip(factors)
                .zip(volumes)
                .map(|((schedule, factor), volume)| -> Result<f64> {
                    if *factor == 0.0 {
                        return Ok(0.0);
                    }
                    Ok(volume * self.curve.coefficient_for(schedule, date)? / factor)
                })
                .collect::<Result<Vec<f64>>>()?;
            node_farm[[row, col]] = crops.iter().sum();
            per_crop.insert(id, crops);
        }
        let node_totals = node_farm.sum_axis(Axis(1)).to_vec();
        debug!("{} diverts {} in total", date, node_totals.iter().sum::<f64>());

        Ok(DiversionTable {
            date,
            nodes: matrix.nodes().to_vec(),
            farm_ids: matrix.farm_ids(),
            node_totals,
            node_farm,
            per_crop,
        })
    }

    /// Diversion tables for every day of `[start, end]`, collected as node
    /// time series.
    pub fn diversion_series(&self, start: NaiveDate, end: NaiveDate) -> Result<DiversionSeries> {
        self.require("diversion_series", AllocatorState::Simulated)?;
        let matrix = self.attached_matrix("diversion_series")?;
        let mut series = DiversionSeries::new(matrix.nodes().to_vec());
        for date in DateRange(start, end) {
            series.push(&self.compute_diversions(date)?);
        }
        info!(
            "computed diversions for {} days at {} nodes",
            series.dates().len(),
            series.nodes().len()
        );
        Ok(series)
    }

    /// Spread each farm's diversion on `table.date` over its irrigated cells.
    pub fn compute_supplemental_irrigation(
        &self,
        land_use: &Array2<i64>,
        irrigated_classes: &[i64],
        table: &DiversionTable,
    ) -> Result<SupplementalIrrigationMap> {
        self.require("compute_supplemental_irrigation", AllocatorState::MaskSet)?;
        self.grid().ensure_shape(land_use.dim())?;
        let mask = self
            .mask
            .as_ref()
            .ok_or_else(|| self.invalid_state("compute_supplemental_irrigation", AllocatorState::MaskSet))?;
        SupplementalIrrigationMap::compute(mask, land_use, irrigated_classes, table)
    }

    /// [`Self::compute_supplemental_irrigation`] over the configured
    /// `irrigated_classes`.
    pub fn compute_configured_irrigation(
        &self,
        land_use: &Array2<i64>,
        table: &DiversionTable,
    ) -> Result<SupplementalIrrigationMap> {
        if self.config.irrigated_classes.is_empty() {
            warn!("no irrigated land-use classes configured, the map will be empty");
        }
        self.compute_supplemental_irrigation(land_use, &self.config.irrigated_classes, table)
    }

    /// Write the state of every attached farm to `path`.
    pub fn export_farms<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        self.require("export_farms", AllocatorState::FarmsAttached)?;
        let matrix = self.attached_matrix("export_farms")?;
        export::export_farms(matrix.attached().map(|(_, _, f)| f), path)
    }

    fn clear_factors(&mut self) {
        self.schedules.clear();
        self.factors.clear();
        self.water_use = None;
    }

    fn require(&self, operation: &'static str, required: AllocatorState) -> Result<()> {
        if self.state < required {
            return Err(self.invalid_state(operation, required));
        }
        Ok(())
    }

    fn invalid_state(&self, operation: &'static str, required: AllocatorState) -> CouplingError {
        CouplingError::InvalidState {
            operation,
            required: required.name(),
            actual: self.state.name(),
        }
    }

    fn attached_matrix(&self, operation: &'static str) -> Result<&FarmNodeMatrix<'a, F>> {
        self.matrix
            .as_ref()
            .ok_or_else(|| self.invalid_state(operation, AllocatorState::FarmsAttached))
    }
}

fn describe<F: WaterUser>(farm: &F) -> String {
    if farm.name().is_empty() {
        farm.id().to_string()
    } else {
        format!("{} ({})", farm.id(), farm.name())
    }
}
