//! Spatial predicate types and their exact evaluation.

use std::fmt;

use geo::{BoundingRect, Distance as _, Euclidean, Geometry, Intersects, Relate};
use serde::{Deserialize, Serialize};

use crate::crs::{Crs, DistanceUnit};
use crate::errors::{SpatialError, SpatialResult};
use crate::geometry::PredicateOperand;

/// The geometric relation tested between a stored geometry and an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialPredicateType {
    Equals,
    Disjoint,
    Intersects,
    Touches,
    Crosses,
    Within,
    Contains,
    Overlaps,
    BBox,
    DWithin,
    Beyond,
}

impl SpatialPredicateType {
    /// Reverse predicates match records the index search does *not* return.
    pub fn is_reverse(&self) -> bool {
        matches!(self, SpatialPredicateType::Disjoint | SpatialPredicateType::Beyond)
    }

    pub fn is_distance_based(&self) -> bool {
        matches!(self, SpatialPredicateType::DWithin | SpatialPredicateType::Beyond)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpatialPredicateType::Equals => "equals",
            SpatialPredicateType::Disjoint => "disjoint",
            SpatialPredicateType::Intersects => "intersects",
            SpatialPredicateType::Touches => "touches",
            SpatialPredicateType::Crosses => "crosses",
            SpatialPredicateType::Within => "within",
            SpatialPredicateType::Contains => "contains",
            SpatialPredicateType::Overlaps => "overlaps",
            SpatialPredicateType::BBox => "bbox",
            SpatialPredicateType::DWithin => "dwithin",
            SpatialPredicateType::Beyond => "beyond",
        }
    }
}

impl fmt::Display for SpatialPredicateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Buffer distance of a DWITHIN or BEYOND predicate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub value: f64,
    pub unit: DistanceUnit,
}

impl Distance {
    pub fn new(value: f64, unit: DistanceUnit) -> Self {
        Distance { value, unit }
    }

    /// The distance expressed in the axis unit of `crs`.
    pub fn in_crs(&self, crs: Crs) -> f64 {
        self.unit.convert(self.value, crs.linear_unit())
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// An immutable spatial predicate: relation type, literal operand and, for
/// distance predicates, the buffer distance.
#[derive(Debug, Clone)]
pub struct SpatialPredicate {
    kind: SpatialPredicateType,
    operand: PredicateOperand,
    distance: Option<Distance>,
}

impl SpatialPredicate {
    /// Creates a binary (non-distance) predicate.
    ///
    /// Fails when `operand` is empty or has non-finite bounds.
    pub fn new(kind: SpatialPredicateType, operand: impl Into<PredicateOperand>) -> SpatialResult<Self> {
        if kind.is_distance_based() {
            return Err(SpatialError::ContractViolation(format!(
                "{} requires a distance",
                kind
            )));
        }
        let operand = operand.into();
        operand.own_envelope()?;
        Ok(SpatialPredicate {
            kind,
            operand,
            distance: None,
        })
    }

    /// Creates a DWITHIN or BEYOND predicate.
    pub fn with_distance(
        kind: SpatialPredicateType,
        operand: impl Into<PredicateOperand>,
        distance: f64,
        unit: DistanceUnit,
    ) -> SpatialResult<Self> {
        if !kind.is_distance_based() {
            return Err(SpatialError::ContractViolation(format!(
                "{} does not take a distance",
                kind
            )));
        }
        if !distance.is_finite() || distance < 0.0 {
            return Err(SpatialError::ContractViolation(format!(
                "invalid {} distance: {}",
                kind, distance
            )));
        }
        let operand = operand.into();
        operand.own_envelope()?;
        Ok(SpatialPredicate {
            kind,
            operand,
            distance: Some(Distance::new(distance, unit)),
        })
    }

    #[inline]
    pub fn kind(&self) -> SpatialPredicateType {
        self.kind
    }

    #[inline]
    pub fn operand(&self) -> &PredicateOperand {
        &self.operand
    }

    #[inline]
    pub fn distance(&self) -> Option<Distance> {
        self.distance
    }

    /// Evaluates the predicate against `stored`, where both `stored` and
    /// `operand` are already expressed in `crs`.
    pub fn evaluate(&self, stored: &Geometry<f64>, operand: &Geometry<f64>, crs: Crs) -> bool {
        match self.kind {
            SpatialPredicateType::DWithin | SpatialPredicateType::Beyond => {
                let limit = self.distance.map(|d| d.in_crs(crs)).unwrap_or(0.0);
                let distance = Euclidean.distance(stored, operand);
                if self.kind == SpatialPredicateType::DWithin {
                    distance <= limit
                } else {
                    distance > limit
                }
            }
            SpatialPredicateType::BBox => match operand.bounding_rect() {
                Some(rect) => stored.intersects(&Geometry::Polygon(rect.to_polygon())),
                None => false,
            },
            kind => {
                let matrix = stored.relate(operand);
                match kind {
                    SpatialPredicateType::Equals => matrix.is_equal_topo(),
                    SpatialPredicateType::Disjoint => matrix.is_disjoint(),
                    SpatialPredicateType::Intersects => matrix.is_intersects(),
                    SpatialPredicateType::Touches => matrix.is_touches(),
                    SpatialPredicateType::Crosses => matrix.is_crosses(),
                    SpatialPredicateType::Within => matrix.is_within(),
                    SpatialPredicateType::Contains => matrix.is_contains(),
                    SpatialPredicateType::Overlaps => matrix.is_overlaps(),
                    _ => false,
                }
            }
        }
    }
}

impl PartialEq for SpatialPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.operand == other.operand
            && self.distance.map(|d| (d.value.to_bits(), d.unit))
                == other.distance.map(|d| (d.value.to_bits(), d.unit))
    }
}

impl Eq for SpatialPredicate {}

impl std::hash::Hash for SpatialPredicate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.operand.hash(state);
        if let Some(d) = self.distance {
            d.value.to_bits().hash(state);
            d.unit.hash(state);
        }
    }
}

impl fmt::Display for SpatialPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.distance {
            Some(d) => write!(f, "{} {} {}", self.kind, d, self.operand),
            None => write!(f, "{} {}", self.kind, self.operand),
        }
    }
}
