//! Coordinate reference systems, distance units and reprojection.

use std::f64::consts::PI;
use std::fmt;

use geo::{BoundingRect, Coord, Geometry, MapCoords};
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::errors::{SpatialError, SpatialResult};

/// Approximate length of one degree of arc along the equator, in meters.
pub const METERS_PER_DEGREE: f64 = 111_319.490_793_273_57;

/// Semi-major axis of the WGS84 ellipsoid used by spherical Web Mercator.
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Latitude beyond which Web Mercator is undefined.
const WEB_MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Crs {
    srid: u32,
}

impl Crs {
    /// Undefined planar coordinates.
    pub const CARTESIAN: Crs = Crs { srid: 0 };
    /// Geographic longitude/latitude on WGS84.
    pub const WGS84: Crs = Crs { srid: 4326 };
    /// Spherical Web Mercator, meters.
    pub const WEB_MERCATOR: Crs = Crs { srid: 3857 };

    pub const fn new(srid: u32) -> Self {
        Crs { srid }
    }

    #[inline]
    pub fn srid(&self) -> u32 {
        self.srid
    }

    /// Returns true if coordinates are angular (degrees).
    pub fn is_geographic(&self) -> bool {
        self.srid == Crs::WGS84.srid
    }

    /// Unit in which distances along this system's axes are expressed.
    pub fn linear_unit(&self) -> LinearUnit {
        if self.is_geographic() {
            LinearUnit::Degrees
        } else {
            LinearUnit::Meters
        }
    }
}

impl Default for Crs {
    fn default() -> Self {
        Crs::WGS84
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.srid)
    }
}

/// Axis unit of a coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinearUnit {
    Degrees,
    Meters,
}

/// Unit attached to the distance of a DWITHIN or BEYOND predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    Feet,
    Miles,
    NauticalMiles,
    Degrees,
}

impl DistanceUnit {
    fn meters_factor(&self) -> Option<f64> {
        match self {
            DistanceUnit::Meters => Some(1.0),
            DistanceUnit::Kilometers => Some(1_000.0),
            DistanceUnit::Feet => Some(0.3048),
            DistanceUnit::Miles => Some(1_609.344),
            DistanceUnit::NauticalMiles => Some(1_852.0),
            DistanceUnit::Degrees => None,
        }
    }

    /// Converts `value` expressed in this unit into `target` units.
    ///
    /// Angular and metric distances are related through [`METERS_PER_DEGREE`],
    /// which is exact only along the equator. Search envelopes built from the
    /// converted value are therefore approximate, and exact refinement uses
    /// the same conversion so both phases agree.
    pub fn convert(&self, value: f64, target: LinearUnit) -> f64 {
        match (self.meters_factor(), target) {
            (Some(factor), LinearUnit::Meters) => value * factor,
            (Some(factor), LinearUnit::Degrees) => value * factor / METERS_PER_DEGREE,
            (None, LinearUnit::Degrees) => value,
            (None, LinearUnit::Meters) => value * METERS_PER_DEGREE,
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Feet => "ft",
            DistanceUnit::Miles => "mi",
            DistanceUnit::NauticalMiles => "nmi",
            DistanceUnit::Degrees => "deg",
        };
        write!(f, "{}", name)
    }
}

/// Service converting geometries and envelopes between reference systems.
///
/// Implementations are shared between segment evaluations running on
/// different threads and must not keep mutable state.
pub trait Reprojector: Send + Sync {
    /// Reprojects `geometry` from `from` into `to`.
    fn reproject_geometry(
        &self,
        geometry: &Geometry<f64>,
        from: Crs,
        to: Crs,
    ) -> SpatialResult<Geometry<f64>>;

    /// Reprojects an envelope, returning the bounds of its reprojected outline.
    fn reproject_envelope(&self, envelope: &Envelope, to: Crs) -> SpatialResult<Envelope> {
        if envelope.crs() == to {
            return Ok(*envelope);
        }
        let outline = Geometry::Polygon(envelope.to_polygon());
        let projected = self.reproject_geometry(&outline, envelope.crs(), to)?;
        projected
            .bounding_rect()
            .map(|rect| Envelope::from_rect(rect, to))
            .ok_or(SpatialError::Reprojection {
                from: envelope.crs(),
                to,
            })
    }
}

/// Reprojector supporting the identity transform and WGS84 to and from
/// spherical Web Mercator.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardReprojector;

impl StandardReprojector {
    fn to_web_mercator(coord: Coord<f64>) -> Option<Coord<f64>> {
        if coord.y.abs() > WEB_MERCATOR_MAX_LATITUDE || coord.x.abs() > 180.0 {
            return None;
        }
        let x = coord.x.to_radians() * WEB_MERCATOR_RADIUS;
        let y = (PI / 4.0 + coord.y.to_radians() / 2.0).tan().ln() * WEB_MERCATOR_RADIUS;
        Some(Coord { x, y })
    }

    fn to_wgs84(coord: Coord<f64>) -> Option<Coord<f64>> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return None;
        }
        let lon = (coord.x / WEB_MERCATOR_RADIUS).to_degrees();
        let lat = (2.0 * (coord.y / WEB_MERCATOR_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        Some(Coord { x: lon, y: lat })
    }
}

impl Reprojector for StandardReprojector {
    fn reproject_geometry(
        &self,
        geometry: &Geometry<f64>,
        from: Crs,
        to: Crs,
    ) -> SpatialResult<Geometry<f64>> {
        if from == to {
            return Ok(geometry.clone());
        }

        let transform: fn(Coord<f64>) -> Option<Coord<f64>> = match (from, to) {
            (Crs::WGS84, Crs::WEB_MERCATOR) => Self::to_web_mercator,
            (Crs::WEB_MERCATOR, Crs::WGS84) => Self::to_wgs84,
            _ => return Err(SpatialError::Reprojection { from, to }),
        };

        geometry.try_map_coords(|coord| transform(coord).ok_or(SpatialError::Reprojection { from, to }))
    }
}
