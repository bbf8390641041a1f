//! Geometry values tagged with their coordinate reference system, and
//! the literal operand of a spatial predicate.

use std::fmt;
use std::hash::{Hash, Hasher};

use geo::{BoundingRect, CoordsIter, Geometry};

use crate::crs::{Crs, Reprojector};
use crate::envelope::Envelope;
use crate::errors::{SpatialError, SpatialResult};

/// A decoded geometry together with the reference system it is expressed in.
///
/// Equality and hashing compare coordinates bit for bit, so `0.0` and `-0.0`
/// are different and `NaN` equals itself.
#[derive(Debug, Clone)]
pub struct CrsGeometry {
    geometry: Geometry<f64>,
    crs: Crs,
}

impl CrsGeometry {
    pub fn new(geometry: impl Into<Geometry<f64>>, crs: Crs) -> Self {
        CrsGeometry {
            geometry: geometry.into(),
            crs,
        }
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    #[inline]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn into_geometry(self) -> Geometry<f64> {
        self.geometry
    }

    /// Bounding envelope, or `None` for empty geometries.
    pub fn envelope(&self) -> Option<Envelope> {
        self.geometry
            .bounding_rect()
            .map(|rect| Envelope::from_rect(rect, self.crs))
    }

    /// Returns the geometry expressed in `to`, borrowing when no work is needed.
    pub fn reprojected(
        &self,
        to: Crs,
        reprojector: &dyn Reprojector,
    ) -> SpatialResult<std::borrow::Cow<'_, Geometry<f64>>> {
        if self.crs == to {
            return Ok(std::borrow::Cow::Borrowed(&self.geometry));
        }
        reprojector
            .reproject_geometry(&self.geometry, self.crs, to)
            .map(std::borrow::Cow::Owned)
    }
}

impl CrsGeometry {
    /// Shape of the coordinate sequence: the geometry kind and the length of
    /// every part, so that equal coordinate streams in different layouts
    /// stay apart.
    fn layout(&self) -> Vec<usize> {
        fn push(geometry: &Geometry<f64>, out: &mut Vec<usize>) {
            out.push(match geometry {
                Geometry::Point(_) => 0,
                Geometry::Line(_) => 1,
                Geometry::LineString(_) => 2,
                Geometry::Polygon(_) => 3,
                Geometry::MultiPoint(_) => 4,
                Geometry::MultiLineString(_) => 5,
                Geometry::MultiPolygon(_) => 6,
                Geometry::GeometryCollection(_) => 7,
                Geometry::Rect(_) => 8,
                Geometry::Triangle(_) => 9,
            });
            match geometry {
                Geometry::Polygon(p) => {
                    out.push(p.exterior().0.len());
                    out.extend(p.interiors().iter().map(|ring| ring.0.len()));
                }
                Geometry::MultiLineString(lines) => {
                    out.extend(lines.0.iter().map(|line| line.0.len()));
                }
                Geometry::MultiPolygon(polygons) => {
                    for p in &polygons.0 {
                        push(&Geometry::Polygon(p.clone()), out);
                    }
                }
                Geometry::GeometryCollection(members) => {
                    out.push(members.0.len());
                    for member in &members.0 {
                        push(member, out);
                    }
                }
                other => out.push(other.coords_count()),
            }
        }
        let mut out = Vec::new();
        push(&self.geometry, &mut out);
        out
    }

    fn coord_bits(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.geometry
            .coords_iter()
            .map(|coord| (coord.x.to_bits(), coord.y.to_bits()))
    }
}

impl PartialEq for CrsGeometry {
    fn eq(&self, other: &Self) -> bool {
        self.crs == other.crs
            && self.layout() == other.layout()
            && self.coord_bits().eq(other.coord_bits())
    }
}

impl Eq for CrsGeometry {}

impl Hash for CrsGeometry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.layout().hash(state);
        for bits in self.coord_bits() {
            bits.hash(state);
        }
        self.crs.hash(state);
    }
}

impl fmt::Display for CrsGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.geometry {
            Geometry::Point(p) => return write!(f, "POINT({} {}; {})", p.x(), p.y(), self.crs),
            Geometry::Line(_) => "LINE",
            Geometry::LineString(_) => "LINESTRING",
            Geometry::Polygon(_) => "POLYGON",
            Geometry::MultiPoint(_) => "MULTIPOINT",
            Geometry::MultiLineString(_) => "MULTILINESTRING",
            Geometry::MultiPolygon(_) => "MULTIPOLYGON",
            Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
            Geometry::Rect(_) => "RECT",
            Geometry::Triangle(_) => "TRIANGLE",
        };
        match self.envelope() {
            Some(env) => write!(
                f,
                "{}[{} {}, {} {}; {}]",
                kind, env.min_x, env.min_y, env.max_x, env.max_y, self.crs
            ),
            None => write!(f, "{} EMPTY", kind),
        }
    }
}

/// The literal right-hand side of a spatial predicate.
///
/// Operands carry their own reference system and are reprojected lazily into
/// the index system at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredicateOperand {
    Geometry(CrsGeometry),
    Envelope(Envelope),
}

impl PredicateOperand {
    pub fn geometry(geometry: impl Into<Geometry<f64>>, crs: Crs) -> Self {
        PredicateOperand::Geometry(CrsGeometry::new(geometry, crs))
    }

    pub fn envelope(envelope: Envelope) -> Self {
        PredicateOperand::Envelope(envelope)
    }

    pub fn crs(&self) -> Crs {
        match self {
            PredicateOperand::Geometry(g) => g.crs(),
            PredicateOperand::Envelope(e) => e.crs(),
        }
    }

    /// The operand's envelope in its own reference system.
    ///
    /// Fails for empty geometries and for bounds that are not finite.
    pub fn own_envelope(&self) -> SpatialResult<Envelope> {
        let envelope = match self {
            PredicateOperand::Geometry(g) => g.envelope().ok_or_else(|| {
                SpatialError::ContractViolation("predicate operand geometry is empty".to_string())
            })?,
            PredicateOperand::Envelope(e) => *e,
        };
        if !envelope.is_valid() {
            return Err(SpatialError::ContractViolation(format!(
                "predicate operand has invalid bounds: {}",
                envelope
            )));
        }
        Ok(envelope)
    }

    /// The operand's envelope expressed in `to`.
    pub fn envelope_in(&self, to: Crs, reprojector: &dyn Reprojector) -> SpatialResult<Envelope> {
        match self {
            PredicateOperand::Geometry(g) => {
                let geometry = g.reprojected(to, reprojector)?;
                geometry
                    .bounding_rect()
                    .map(|rect| Envelope::from_rect(rect, to))
                    .ok_or_else(|| {
                        SpatialError::ContractViolation(
                            "predicate operand geometry is empty".to_string(),
                        )
                    })
            }
            PredicateOperand::Envelope(e) => reprojector.reproject_envelope(e, to),
        }
    }

    /// The operand as a geometry expressed in `to`. Envelopes become polygons.
    pub fn geometry_in(&self, to: Crs, reprojector: &dyn Reprojector) -> SpatialResult<Geometry<f64>> {
        match self {
            PredicateOperand::Geometry(g) => Ok(g.reprojected(to, reprojector)?.into_owned()),
            PredicateOperand::Envelope(e) => {
                let outline = Geometry::Polygon(e.to_polygon());
                reprojector.reproject_geometry(&outline, e.crs(), to)
            }
        }
    }
}

impl fmt::Display for PredicateOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateOperand::Geometry(g) => write!(f, "{}", g),
            PredicateOperand::Envelope(e) => write!(f, "{}", e),
        }
    }
}

impl From<Envelope> for PredicateOperand {
    fn from(envelope: Envelope) -> Self {
        PredicateOperand::Envelope(envelope)
    }
}

impl From<CrsGeometry> for PredicateOperand {
    fn from(geometry: CrsGeometry) -> Self {
        PredicateOperand::Geometry(geometry)
    }
}
