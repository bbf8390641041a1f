//! Fluent API for building spatial queries.
//!
//! ## Example
//!
//! ```rust
//! use geo_predicate::{chain, spatial, Crs, DistanceUnit, Envelope, LogicalOperator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let area = Envelope::new(0.0, 0.0, 10.0, 10.0, Crs::CARTESIAN);
//!
//! // Records inside the area, except those within 2 units of its corner
//! let inside = spatial(area).within()?;
//! let corner = spatial(Envelope::new(0.0, 0.0, 0.0, 0.0, Crs::CARTESIAN))
//!     .dwithin(2.0, DistanceUnit::Meters)?;
//! let filter = chain(
//!     vec![inside.into(), corner.into()],
//!     vec![LogicalOperator::And, LogicalOperator::Not],
//! )?;
//! # Ok(())
//! # }
//! ```

use crate::chain::{LogicalOperator, SerialChainFilter};
use crate::config::SpatialConfig;
use crate::crs::DistanceUnit;
use crate::errors::SpatialResult;
use crate::filter::SpatialFilter;
use crate::geometry::PredicateOperand;
use crate::predicate::{SpatialPredicate, SpatialPredicateType};
use crate::predicate_query::SpatialPredicateQuery;

/// Wraps a predicate into a query with default configuration.
pub fn wrap(predicate: SpatialPredicate) -> SpatialPredicateQuery {
    SpatialPredicateQuery::wrap(predicate)
}

/// Combines filters left to right with `operators`.
pub fn chain(
    filters: Vec<SpatialFilter>,
    operators: Vec<LogicalOperator>,
) -> SpatialResult<SerialChainFilter> {
    SerialChainFilter::new(filters, operators)
}

/// Starts a predicate against `operand`.
pub fn spatial(operand: impl Into<PredicateOperand>) -> SpatialFluentPredicate {
    SpatialFluentPredicate {
        operand: operand.into(),
        config: None,
    }
}

/// A fluent builder for spatial predicate queries.
///
/// Use [`spatial()`] to start building a predicate.
#[derive(Debug, Clone)]
pub struct SpatialFluentPredicate {
    operand: PredicateOperand,
    config: Option<SpatialConfig>,
}

impl SpatialFluentPredicate {
    /// Uses `config` for the resulting query instead of the defaults.
    pub fn with_config(mut self, config: SpatialConfig) -> Self {
        self.config = Some(config);
        self
    }

    fn finish(self, predicate: SpatialPredicate) -> SpatialPredicateQuery {
        let query = SpatialPredicateQuery::wrap(predicate);
        match self.config {
            Some(config) => query.with_config(config),
            None => query,
        }
    }

    fn binary(self, kind: SpatialPredicateType) -> SpatialResult<SpatialPredicateQuery> {
        let predicate = SpatialPredicate::new(kind, self.operand.clone())?;
        Ok(self.finish(predicate))
    }

    fn distance(
        self,
        kind: SpatialPredicateType,
        distance: f64,
        unit: DistanceUnit,
    ) -> SpatialResult<SpatialPredicateQuery> {
        let predicate = SpatialPredicate::with_distance(kind, self.operand.clone(), distance, unit)?;
        Ok(self.finish(predicate))
    }

    // =========================================================================
    // Relation predicates
    // =========================================================================

    pub fn equals(self) -> SpatialResult<SpatialPredicateQuery> {
        self.binary(SpatialPredicateType::Equals)
    }

    pub fn disjoint(self) -> SpatialResult<SpatialPredicateQuery> {
        self.binary(SpatialPredicateType::Disjoint)
    }

    pub fn intersects(self) -> SpatialResult<SpatialPredicateQuery> {
        self.binary(SpatialPredicateType::Intersects)
    }

    pub fn touches(self) -> SpatialResult<SpatialPredicateQuery> {
        self.binary(SpatialPredicateType::Touches)
    }

    pub fn crosses(self) -> SpatialResult<SpatialPredicateQuery> {
        self.binary(SpatialPredicateType::Crosses)
    }

    /// Stored geometries lying within the operand.
    pub fn within(self) -> SpatialResult<SpatialPredicateQuery> {
        self.binary(SpatialPredicateType::Within)
    }

    /// Stored geometries containing the operand.
    pub fn contains(self) -> SpatialResult<SpatialPredicateQuery> {
        self.binary(SpatialPredicateType::Contains)
    }

    pub fn overlaps(self) -> SpatialResult<SpatialPredicateQuery> {
        self.binary(SpatialPredicateType::Overlaps)
    }

    /// Stored geometries intersecting the operand's bounding box.
    pub fn bbox(self) -> SpatialResult<SpatialPredicateQuery> {
        self.binary(SpatialPredicateType::BBox)
    }

    // =========================================================================
    // Distance predicates
    // =========================================================================

    /// Stored geometries at most `distance` away from the operand.
    pub fn dwithin(self, distance: f64, unit: DistanceUnit) -> SpatialResult<SpatialPredicateQuery> {
        self.distance(SpatialPredicateType::DWithin, distance, unit)
    }

    /// Stored geometries more than `distance` away from the operand.
    pub fn beyond(self, distance: f64, unit: DistanceUnit) -> SpatialResult<SpatialPredicateQuery> {
        self.distance(SpatialPredicateType::Beyond, distance, unit)
    }
}
