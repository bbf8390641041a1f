//! Error and result types for spatial predicate evaluation.

use std::io;

use tantivy::TantivyError;
use thiserror::Error;

use crate::crs::Crs;

/// Errors that can occur while building or evaluating spatial predicates.
///
/// Only [`SpatialError::GeometryDecode`] is recoverable: a record whose stored
/// geometry cannot be decoded is logged and excluded from the result. Every
/// other variant aborts the evaluation of the segment that raised it.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("cannot reproject from {from} to {to}")]
    Reprojection { from: Crs, to: Crs },

    #[error("spatial index access failed: {0}")]
    IndexAccess(String),

    #[error("geometry decode error: {0}")]
    GeometryDecode(String),

    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("search engine error: {0}")]
    Engine(#[from] TantivyError),
}

impl SpatialError {
    /// Returns true if the error only affects a single record.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SpatialError::GeometryDecode(_))
    }
}

impl From<SpatialError> for TantivyError {
    fn from(err: SpatialError) -> Self {
        match err {
            SpatialError::Engine(engine_err) => engine_err,
            SpatialError::ContractViolation(msg) => {
                TantivyError::InvalidArgument(format!("spatial contract violation: {}", msg))
            }
            other => TantivyError::from(io::Error::other(other.to_string())),
        }
    }
}

/// Result type alias for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;
