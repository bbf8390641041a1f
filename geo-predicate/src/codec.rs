//! Binary format of the stored geometry field.
//!
//! A geometry field value is a 4 byte little-endian SRID tag followed by a
//! 2D WKB body:
//!
//! ```text
//! +-----------+---------------------------+
//! | srid: u32 | WKB (any byte order)      |
//! +-----------+---------------------------+
//! ```
//!
//! The body is checked structurally (byte order, type codes, counts and
//! length) before it is handed to the streaming `wkb` reader; the writer
//! always emits little-endian ISO WKB.

use std::io::Write;

use geo::{Coord, Geometry, LineString, Polygon};
use geo_traits::to_geo::ToGeoGeometry;

use crate::crs::Crs;
use crate::errors::{SpatialError, SpatialResult};
use crate::geometry::CrsGeometry;

/// Size of the SRID tag preceding the WKB body.
pub const CRS_TAG_LEN: usize = 4;

const WKB_BIG_ENDIAN: u8 = 0x00;
const WKB_LITTLE_ENDIAN: u8 = 0x01;

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;
const EWKB_FLAGS: u32 = EWKB_Z | EWKB_M | EWKB_SRID;

const MAX_NESTING: usize = 32;

const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOINT: u32 = 4;
const WKB_MULTILINESTRING: u32 = 5;
const WKB_MULTIPOLYGON: u32 = 6;
const WKB_GEOMETRYCOLLECTION: u32 = 7;

/// Encodes a geometry into the tagged field format.
pub fn encode_geometry_field(geometry: &Geometry<f64>, crs: Crs) -> SpatialResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(CRS_TAG_LEN + 64);
    buf.write_all(&crs.srid().to_le_bytes())?;
    write_geometry(&mut buf, geometry)?;
    Ok(buf)
}

/// Decodes a tagged field value into a geometry and its reference system.
pub fn decode_geometry_field(bytes: &[u8]) -> SpatialResult<CrsGeometry> {
    if bytes.len() <= CRS_TAG_LEN {
        return Err(SpatialError::GeometryDecode(format!(
            "field too short: {} bytes",
            bytes.len()
        )));
    }
    let (tag, body) = bytes.split_at(CRS_TAG_LEN);
    let srid = u32::from_le_bytes([tag[0], tag[1], tag[2], tag[3]]);

    check_wkb(body)?;
    let wkb = wkb::reader::read_wkb(body)
        .map_err(|e| SpatialError::GeometryDecode(format!("malformed WKB body: {}", e)))?;
    let geometry = wkb.try_to_geometry().ok_or_else(|| {
        SpatialError::GeometryDecode("WKB body contains an unsupported empty geometry".to_string())
    })?;
    Ok(CrsGeometry::new(geometry, Crs::new(srid)))
}

/// Decoder handed to a single segment evaluation.
///
/// Each scorer call owns its decoder; it is never shared between threads.
#[derive(Debug, Default)]
pub struct GeometryDecoder {
    decoded: usize,
    failed: usize,
}

impl GeometryDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> SpatialResult<CrsGeometry> {
        let result = decode_geometry_field(bytes);
        match result {
            Ok(_) => self.decoded += 1,
            Err(_) => self.failed += 1,
        }
        result
    }

    /// Records a geometry that was missing altogether.
    pub fn record_missing(&mut self) {
        self.failed += 1;
    }

    pub fn decoded(&self) -> usize {
        self.decoded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }
}

/// Walks a WKB body without materializing it.
///
/// Rejects unknown type codes, counts running past the end of the body and
/// trailing bytes.
fn check_wkb(body: &[u8]) -> SpatialResult<()> {
    let mut cursor = WkbCursor { bytes: body, pos: 0 };
    cursor.geometry(0)?;
    if cursor.pos != body.len() {
        return Err(SpatialError::GeometryDecode(format!(
            "{} trailing bytes after WKB body",
            body.len() - cursor.pos
        )));
    }
    Ok(())
}

struct WkbCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WkbCursor<'a> {
    fn take(&mut self, len: usize) -> SpatialResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                SpatialError::GeometryDecode(format!(
                    "WKB body truncated at offset {} ({} bytes wanted)",
                    self.pos, len
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self, little_endian: bool) -> SpatialResult<u32> {
        let b = self.take(4)?;
        let raw = [b[0], b[1], b[2], b[3]];
        Ok(if little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    }

    fn count(&mut self, little_endian: bool, item_len: usize) -> SpatialResult<usize> {
        let count = self.u32(little_endian)? as usize;
        // Every item takes at least `item_len` bytes.
        if count.saturating_mul(item_len) > self.bytes.len() - self.pos {
            return Err(SpatialError::GeometryDecode(format!(
                "WKB count {} exceeds the remaining {} bytes",
                count,
                self.bytes.len() - self.pos
            )));
        }
        Ok(count)
    }

    fn geometry(&mut self, depth: usize) -> SpatialResult<()> {
        if depth > MAX_NESTING {
            return Err(SpatialError::GeometryDecode(
                "WKB collections nested too deeply".to_string(),
            ));
        }
        let little_endian = match self.take(1)?[0] {
            WKB_LITTLE_ENDIAN => true,
            WKB_BIG_ENDIAN => false,
            other => {
                return Err(SpatialError::GeometryDecode(format!(
                    "invalid WKB byte order marker 0x{:02x}",
                    other
                )))
            }
        };
        let raw = self.u32(little_endian)?;
        let mut dims = 2;
        if raw & EWKB_Z != 0 {
            dims += 1;
        }
        if raw & EWKB_M != 0 {
            dims += 1;
        }
        if raw & EWKB_SRID != 0 {
            self.take(4)?;
        }
        let code = raw & !EWKB_FLAGS;
        dims += match code / 1000 {
            0 => 0,
            1 | 2 => 1,
            3 => 2,
            _ => return Err(unknown_type(raw)),
        };
        let coord_len = dims * 8;

        match code % 1000 {
            WKB_POINT => {
                self.take(coord_len)?;
            }
            WKB_LINESTRING => {
                let points = self.count(little_endian, coord_len)?;
                self.take(points * coord_len)?;
            }
            WKB_POLYGON => {
                let rings = self.count(little_endian, 4)?;
                for _ in 0..rings {
                    let points = self.count(little_endian, coord_len)?;
                    self.take(points * coord_len)?;
                }
            }
            WKB_MULTIPOINT | WKB_MULTILINESTRING | WKB_MULTIPOLYGON | WKB_GEOMETRYCOLLECTION => {
                let members = self.count(little_endian, 5)?;
                for _ in 0..members {
                    self.geometry(depth + 1)?;
                }
            }
            _ => return Err(unknown_type(raw)),
        }
        Ok(())
    }
}

fn unknown_type(raw: u32) -> SpatialError {
    SpatialError::GeometryDecode(format!("unknown WKB geometry type {}", raw))
}

fn write_count(buf: &mut impl Write, len: usize) -> SpatialResult<()> {
    let count = u32::try_from(len).map_err(|_| {
        SpatialError::ContractViolation(format!("too many elements to encode: {}", len))
    })?;
    buf.write_all(&count.to_le_bytes())?;
    Ok(())
}

fn write_header(buf: &mut impl Write, kind: u32) -> SpatialResult<()> {
    buf.write_all(&[WKB_LITTLE_ENDIAN])?;
    buf.write_all(&kind.to_le_bytes())?;
    Ok(())
}

fn write_coord(buf: &mut impl Write, coord: Coord<f64>) -> SpatialResult<()> {
    buf.write_all(&coord.x.to_le_bytes())?;
    buf.write_all(&coord.y.to_le_bytes())?;
    Ok(())
}

fn write_ring(buf: &mut impl Write, ring: &LineString<f64>) -> SpatialResult<()> {
    write_count(buf, ring.0.len())?;
    for coord in &ring.0 {
        write_coord(buf, *coord)?;
    }
    Ok(())
}

fn write_linestring(buf: &mut impl Write, line: &LineString<f64>) -> SpatialResult<()> {
    write_header(buf, WKB_LINESTRING)?;
    write_ring(buf, line)
}

fn write_polygon(buf: &mut impl Write, polygon: &Polygon<f64>) -> SpatialResult<()> {
    write_header(buf, WKB_POLYGON)?;
    if polygon.exterior().0.is_empty() {
        return write_count(buf, 0);
    }
    write_count(buf, 1 + polygon.interiors().len())?;
    write_ring(buf, polygon.exterior())?;
    for interior in polygon.interiors() {
        write_ring(buf, interior)?;
    }
    Ok(())
}

fn write_geometry(buf: &mut impl Write, geometry: &Geometry<f64>) -> SpatialResult<()> {
    match geometry {
        Geometry::Point(point) => {
            write_header(buf, WKB_POINT)?;
            write_coord(buf, point.0)
        }
        Geometry::Line(line) => {
            write_linestring(buf, &LineString::from(vec![line.start, line.end]))
        }
        Geometry::LineString(line) => write_linestring(buf, line),
        Geometry::Polygon(polygon) => write_polygon(buf, polygon),
        Geometry::Rect(rect) => write_polygon(buf, &rect.to_polygon()),
        Geometry::Triangle(triangle) => write_polygon(buf, &triangle.to_polygon()),
        Geometry::MultiPoint(points) => {
            write_header(buf, WKB_MULTIPOINT)?;
            write_count(buf, points.0.len())?;
            for point in &points.0 {
                write_header(buf, WKB_POINT)?;
                write_coord(buf, point.0)?;
            }
            Ok(())
        }
        Geometry::MultiLineString(lines) => {
            write_header(buf, WKB_MULTILINESTRING)?;
            write_count(buf, lines.0.len())?;
            for line in &lines.0 {
                write_linestring(buf, line)?;
            }
            Ok(())
        }
        Geometry::MultiPolygon(polygons) => {
            write_header(buf, WKB_MULTIPOLYGON)?;
            write_count(buf, polygons.0.len())?;
            for polygon in &polygons.0 {
                write_polygon(buf, polygon)?;
            }
            Ok(())
        }
        Geometry::GeometryCollection(collection) => {
            write_header(buf, WKB_GEOMETRYCOLLECTION)?;
            write_count(buf, collection.0.len())?;
            for member in &collection.0 {
                write_geometry(buf, member)?;
            }
            Ok(())
        }
    }
}
