/// Error types for the coupling engine
use crate::{CropId, FarmId, Node};
use thiserror::Error;

/// Main error type for coupling operations
#[derive(Error, Debug)]
pub enum CouplingError {
    /// Edge list empty or an edge lacks an endpoint
    #[error("Malformed network: {0}")]
    MalformedNetwork(String),

    /// Crop id not present in the coefficient table
    #[error("Unknown crop id: {0}")]
    UnknownCrop(CropId),

    /// A feature lacks a required integer property
    #[error("Field '{field}' missing or not an integer on feature {index}")]
    MissingField { field: String, index: usize },

    /// Operation called before its prerequisite transition
    #[error("Invalid state: {operation} requires {required}, allocator is {actual}")]
    InvalidState {
        operation: &'static str,
        required: &'static str,
        actual: &'static str,
    },

    /// Two farms divert from the same node while sharing is disabled
    #[error("Farms {first} and {second} both divert from node {node}")]
    DuplicateFarmNode {
        node: Node,
        first: FarmId,
        second: FarmId,
    },

    /// Two water users carry the same id
    #[error("Farm id {0} is used by more than one water user")]
    DuplicateFarmId(FarmId),

    /// The mask fill value is also an attached farm's id
    #[error("Mask fill value {0} is also the id of an attached farm")]
    FillValueCollision(FarmId),

    /// Farm has no crop planting dates
    #[error("Water user {0} has no crop planting dates. Was a scenario simulated?")]
    MissingCropSchedule(String),

    /// Grid shapes do not line up
    #[error("Grid shape mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    ShapeMismatch {
        er: usize,
        ec: usize,
        ar: usize,
        ac: usize,
    },

    /// Per-crop lists of a farm differ in length
    #[error("Farm {farm_id} has mismatched per-crop lists: {reason}")]
    MismatchedCropLists { farm_id: FarmId, reason: String },

    /// Crop dates out of order
    #[error("Invalid schedule for crop {crop_id}: {reason}")]
    InvalidCropSchedule { crop_id: CropId, reason: String },

    /// Simulated water use absent or inconsistent with a farm's crops
    #[error("Missing simulated water use for farm {farm_id}: {reason}")]
    MissingWaterUse { farm_id: FarmId, reason: String },

    /// Crop coefficient table could not be parsed
    #[error("Invalid crop coefficient table: {0}")]
    KcTable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),
}

impl From<geojson::Error> for CouplingError {
    fn from(e: geojson::Error) -> Self {
        CouplingError::GeoJson(Box::new(e))
    }
}

/// Type alias for Results using CouplingError
pub type Result<T> = std::result::Result<T, CouplingError>;
