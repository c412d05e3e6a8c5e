//! Error types for the BSP collision subsystem

use thiserror::Error;

use crate::bsp::LeafId;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("BSP bound overflow: {dimensions} dimensions at depth {depth} cannot be pooled")]
    DimensionOverflow { dimensions: usize, depth: usize },

    #[error("branch pool exhausted ({capacity} branches)")]
    PoolExhausted { capacity: usize },

    #[error("invalid bounding box")]
    InvalidBox,

    #[error("{0} is already inserted")]
    AlreadyInserted(LeafId),

    #[error("unknown {0}")]
    UnknownLeaf(LeafId),

    #[error("leaf extent escapes its branch on axis {axis}")]
    ExtentMismatch { axis: usize },

    #[error("stale branch handle")]
    StaleBranch,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
