use std::hash::Hash;

use geo::{coord, Polygon, Rect};
use rstar::AABB;
use serde::{Deserialize, Serialize};

use crate::crs::Crs;

/// An axis-aligned bounding box in a given coordinate reference system.
///
/// Envelopes are what the spatial index stores and searches; they are derived
/// from record geometries and never owned by the evaluation core.
///
/// # Examples
///
/// ```rust
/// use geo_predicate::{Crs, Envelope};
///
/// let envelope = Envelope::new(0.0, 0.0, 10.0, 10.0, Crs::CARTESIAN);
/// assert!(envelope.intersects(&Envelope::new(5.0, 5.0, 15.0, 15.0, Crs::CARTESIAN)));
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    #[serde(default)]
    crs: Crs,
}

impl Envelope {
    fn bits(&self) -> [u64; 4] {
        [
            self.min_x.to_bits(),
            self.min_y.to_bits(),
            self.max_x.to_bits(),
            self.max_y.to_bits(),
        ]
    }
}

// Bitwise, to agree with `Hash`.
impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.crs == other.crs && self.bits() == other.bits()
    }
}

impl Eq for Envelope {}

impl Hash for Envelope {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
        self.crs.hash(state);
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ENVELOPE({}, {}, {}, {}; {})",
            self.min_x, self.min_y, self.max_x, self.max_y, self.crs
        )
    }
}

impl Envelope {
    /// Creates a new envelope. Corners are normalized so that min <= max.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, crs: Crs) -> Envelope {
        Envelope {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
            crs,
        }
    }

    pub fn from_rect(rect: Rect<f64>, crs: Crs) -> Envelope {
        Envelope::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y, crs)
    }

    #[inline]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Returns the same bounds tagged with another reference system.
    pub fn with_crs(mut self, crs: Crs) -> Envelope {
        self.crs = crs;
        self
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Checks if this envelope fully covers another (boundaries included).
    pub fn contains(&self, other: &Envelope) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    /// Checks if this envelope shares at least one point with another.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Grows the envelope outward by `distance` on every side.
    pub fn buffered(&self, distance: f64) -> Envelope {
        Envelope {
            min_x: self.min_x - distance,
            min_y: self.min_y - distance,
            max_x: self.max_x + distance,
            max_y: self.max_y + distance,
            crs: self.crs,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x
            && self.min_y <= self.max_y
            && self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        )
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        self.to_rect().to_polygon()
    }

    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

/// An envelope paired with the identifier of the record it was derived from.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
pub struct NamedEnvelope {
    record_id: String,
    envelope: Envelope,
}

impl NamedEnvelope {
    pub fn new(record_id: impl Into<String>, envelope: Envelope) -> Self {
        NamedEnvelope {
            record_id: record_id.into(),
            envelope,
        }
    }

    #[inline]
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    #[inline]
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}
