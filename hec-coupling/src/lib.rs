//! Hydro-economic coupling: attaches farms to river nodes, derives seasonal
//! applied water factors from crop coefficients and turns simulated farm
//! water use into daily node diversions and a supplemental irrigation map.
//!
//! ```no_run
//! use hec_coupling::{AllocatorConfig, FarmWaterAllocator, WaterUse};
//! use hec_core::farm::Farm;
//! use hec_core::feature::read_features;
//! use hec_core::grid::{GeoTransform, GridSpec};
//! use hec_crop::{CropCoefficientCurve, KcTable};
//! use hec_network::NetworkTopology;
//!
//! # fn main() -> hec_core::Result<()> {
//! let topology = NetworkTopology::from_path("network.geojson")?;
//! let farms = hec_coupling::load_farms("farms.json")?;
//! let curve = CropCoefficientCurve::new(KcTable::from_path("crop_coefficients.csv")?);
//! let grid = GridSpec::new(100, 100, GeoTransform::new(0.0, 1000.0, 10.0, -10.0));
//!
//! let mut allocator = FarmWaterAllocator::<Farm>::new(curve, grid, AllocatorConfig::default());
//! allocator.attach_farms(&topology, &farms)?;
//! allocator.set_water_user_mask(&read_features("water_users.geojson")?, "id")?;
//! allocator.compute_applied_water_factors()?;
//! allocator.record_simulation(WaterUse::from_farms(&farms))?;
//! let table = allocator.compute_diversions(chrono::NaiveDate::from_ymd_opt(2020, 6, 1).unwrap())?;
//! println!("{:?}", table.node_totals);
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod config;
pub mod diversion;
pub mod export;
pub mod irrigation;
pub mod matrix;
pub mod water_use;

pub use allocator::{AllocatorState, AppliedWaterFactors, FarmWaterAllocator};
pub use config::AllocatorConfig;
pub use diversion::{DiversionSeries, DiversionTable, NodeSeriesDocument};
pub use export::{export_farms, load_farms};
pub use irrigation::SupplementalIrrigationMap;
pub use matrix::FarmNodeMatrix;
pub use water_use::WaterUse;
