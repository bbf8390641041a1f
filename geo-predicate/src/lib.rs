//! # Geo Predicate - Spatial Predicate Evaluation for Tantivy
//!
//! This crate evaluates geometric predicates over documents stored in a
//! Tantivy index and exposes the result as ordinary Tantivy queries, so
//! spatial filters compose with full-text search and boolean queries.
//!
//! ## Features
//!
//! - **Eleven Predicates**: equals, disjoint, intersects, touches, crosses,
//!   within, contains, overlaps, bbox, dwithin and beyond
//! - **Two-Phase Search**: an attached spatial index prunes candidates, exact
//!   geometry tests refine them
//! - **Envelope-Only Mode**: skip refinement when bounding boxes are enough
//! - **Filter Chains**: AND, OR, XOR and NOT folded left to right per segment
//! - **Composite Queries**: free text joined with spatial filters
//! - **Reprojection**: operands are converted into the index reference system
//! - **Thread Safe**: segments can be scored concurrently
//!
//! ## Quick Start
//!
//! ```rust
//! use geo_predicate::{encode_geometry_field, spatial, Crs, Envelope};
//! use geo::point;
//! use tantivy::collector::Count;
//! use tantivy::schema::{Schema, STORED, STRING};
//! use tantivy::{Index, TantivyDocument};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = Schema::builder();
//! let id = builder.add_text_field("id", STRING | STORED);
//! let geometry = builder.add_bytes_field("geometry", STORED);
//! let index = Index::create_in_ram(builder.build());
//!
//! let mut writer = index.writer_with_num_threads(1, 50_000_000)?;
//! let mut doc = TantivyDocument::default();
//! doc.add_text(id, "cafe");
//! let bytes = encode_geometry_field(&point!(x: 2.0, y: 3.0).into(), Crs::CARTESIAN)?;
//! doc.add_bytes(geometry, bytes.as_slice());
//! writer.add_document(doc)?;
//! writer.commit()?;
//!
//! let query = spatial(Envelope::new(0.0, 0.0, 5.0, 5.0, Crs::CARTESIAN)).within()?;
//! let searcher = index.reader()?.searcher();
//! assert_eq!(searcher.search(&query, &Count)?, 1);
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod bitmap;
pub mod chain;
pub mod codec;
pub mod composite;
pub mod config;
pub mod crs;
pub mod envelope;
pub mod errors;
pub mod filter;
pub mod fluent;
pub mod geometry;
pub mod index;
pub mod predicate;
pub mod predicate_query;
pub mod scorer;
pub mod weight;

pub use accessor::{FieldValue, GeometryFieldAccessor, StoredValue};
pub use bitmap::DocBitmap;
pub use chain::{ChainWeight, LogicalOperator, SerialChainFilter};
pub use codec::{decode_geometry_field, encode_geometry_field, GeometryDecoder, CRS_TAG_LEN};
pub use composite::{
    CompositeSpatialQuery, CompositeSpatialQueryBuilder, SortKey, SortOrder, SortType, TextQuery,
};
pub use config::SpatialConfig;
pub use crs::{Crs, DistanceUnit, LinearUnit, Reprojector, StandardReprojector};
pub use envelope::{Envelope, NamedEnvelope};
pub use errors::{SpatialError, SpatialResult};
pub use filter::{AttachIndex, DocIdSetProducer, FilterWeight, ProduceWeight, SpatialFilter};
pub use fluent::{chain, spatial, wrap, SpatialFluentPredicate};
pub use geometry::{CrsGeometry, PredicateOperand};
pub use index::{ElementMapper, IndexBinding, InternalId, MemoryElementMapper, RStarSpatialIndex, SpatialIndex};
pub use predicate::{Distance, SpatialPredicate, SpatialPredicateType};
pub use predicate_query::SpatialPredicateQuery;
pub use scorer::BitmapScorer;
pub use weight::PredicateWeight;
