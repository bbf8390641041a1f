//! Field access over stored documents.
//!
//! The designated geometry field is decoded on demand; any other field is
//! returned as the raw stored value. There is no write path here.

use tantivy::schema::{Field, Schema, Value};
use tantivy::TantivyDocument;

use crate::codec::GeometryDecoder;
use crate::errors::{SpatialError, SpatialResult};
use crate::geometry::CrsGeometry;

/// A stored field value as read from the doc store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Text(String),
    Bytes(Vec<u8>),
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
}

impl StoredValue {
    fn from_value<'a, V: Value<'a>>(value: V) -> Option<StoredValue> {
        if let Some(text) = value.as_str() {
            Some(StoredValue::Text(text.to_string()))
        } else if let Some(bytes) = value.as_bytes() {
            Some(StoredValue::Bytes(bytes.to_vec()))
        } else if let Some(n) = value.as_u64() {
            Some(StoredValue::U64(n))
        } else if let Some(n) = value.as_i64() {
            Some(StoredValue::I64(n))
        } else if let Some(n) = value.as_f64() {
            Some(StoredValue::F64(n))
        } else {
            value.as_bool().map(StoredValue::Bool)
        }
    }
}

/// Result of reading a field through the accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Geometry(CrsGeometry),
    Raw(StoredValue),
}

/// Reads geometries and record identifiers out of stored documents.
///
/// The accessor itself is immutable and freely shared; decoding state lives
/// in the [`GeometryDecoder`] passed to each call.
#[derive(Debug, Clone)]
pub struct GeometryFieldAccessor {
    schema: Schema,
    geometry_field: Field,
    geometry_field_name: String,
    id_field: Option<Field>,
}

impl GeometryFieldAccessor {
    /// Resolves the geometry field (required) and the record id field
    /// (optional) against `schema`.
    pub fn new(schema: &Schema, geometry_field_name: &str, id_field_name: &str) -> SpatialResult<Self> {
        let geometry_field = schema.get_field(geometry_field_name)?;
        Ok(GeometryFieldAccessor {
            schema: schema.clone(),
            geometry_field,
            geometry_field_name: geometry_field_name.to_string(),
            id_field: schema.get_field(id_field_name).ok(),
        })
    }

    #[inline]
    pub fn geometry_field(&self) -> Field {
        self.geometry_field
    }

    /// Reads `field_name` from `doc`.
    ///
    /// For the geometry field the tagged binary value is decoded; a missing or
    /// malformed geometry yields [`SpatialError::GeometryDecode`]. Other
    /// fields come back unchanged, or `None` when absent.
    pub fn field_value(
        &self,
        doc: &TantivyDocument,
        field_name: &str,
        decoder: &mut GeometryDecoder,
    ) -> SpatialResult<Option<FieldValue>> {
        if field_name == self.geometry_field_name {
            return self.geometry(doc, decoder).map(|g| Some(FieldValue::Geometry(g)));
        }
        let field = self.schema.get_field(field_name)?;
        Ok(doc.get_first(field).and_then(StoredValue::from_value).map(FieldValue::Raw))
    }

    /// Decodes the geometry stored in `doc`.
    pub fn geometry(
        &self,
        doc: &TantivyDocument,
        decoder: &mut GeometryDecoder,
    ) -> SpatialResult<CrsGeometry> {
        match doc.get_first(self.geometry_field).and_then(|v| v.as_bytes()) {
            Some(bytes) => decoder.decode(bytes),
            None => {
                decoder.record_missing();
                Err(SpatialError::GeometryDecode(format!(
                    "no geometry stored in field '{}'",
                    self.geometry_field_name
                )))
            }
        }
    }

    /// The record identifier stored in `doc`, if any.
    pub fn record_id<'a>(&self, doc: &'a TantivyDocument) -> Option<&'a str> {
        let field = self.id_field?;
        doc.get_first(field).and_then(|v| v.as_str())
    }
}
