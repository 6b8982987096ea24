//! Core types shared by the water allocation coupling crates.
//!
//! - [`error`]: the error taxonomy every library crate returns
//! - [`farm`]: the farm record and the [`farm::WaterUser`] capability trait
//! - [`feature`]: vector features read from GeoJSON
//! - [`grid`]: the reference grid and its affine transform

pub mod error;
pub mod farm;
pub mod feature;
pub mod grid;

pub use error::{CouplingError, Result};

/// Identifier of a river network junction or reach endpoint.
pub type Node = i64;

/// Identifier of a water user (farm).
pub type FarmId = i64;

/// Crop identifier as used by the crop coefficient table.
pub type CropId = i64;

/// Node id meaning "outside the modeled basin".
pub const OUTSIDE_BASIN: Node = 0;
