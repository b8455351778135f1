//! Error types for the clustering engine
//!
//! This module provides structured error types using thiserror so that the
//! transport layer can surface descriptive messages and stable codes.

use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Registry lookups
    #[error("Area {id} not found. Create it first with a POST to /api/area")]
    UnknownArea { id: i64 },

    #[error("Unknown distance function {id}. Available ids are listed at /api/distances")]
    UnknownDistanceFunction { id: i64 },

    /// Coordinate count disagrees with the area's established dimensionality
    #[error("Dimension mismatch: area expects {expected} coordinates, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid point: {reason}")]
    InvalidPoint { reason: String },

    #[error("Invalid max age {value}: the iteration budget must be a positive integer")]
    InvalidMaxAge { value: i64 },
}

impl EngineError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::UnknownArea { .. } => "UNKNOWN_AREA",
            Self::UnknownDistanceFunction { .. } => "UNKNOWN_DISTANCE_FUNCTION",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::InvalidPoint { .. } => "INVALID_POINT",
            Self::InvalidMaxAge { .. } => "INVALID_MAX_AGE",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::UnknownArea { .. } => vec![
                "Area ids are not preserved across server restarts",
                "Create a new area and repopulate it",
            ],
            Self::DimensionMismatch { .. } => vec![
                "All points and cluster centers in one area must share a dimensionality",
                "Clear the area to start over with a different dimensionality",
            ],
            Self::InvalidMaxAge { .. } => vec!["Omit max_age or pass 0 to use the default of 100"],
            _ => vec![],
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
