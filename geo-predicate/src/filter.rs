//! Composable spatial filters.
//!
//! A [`SpatialFilter`] is either a single predicate or a chain of filters.
//! Behaviour shared by every variant is expressed as capability traits and
//! dispatched by matching on the variant.

use tantivy::query::{EnableScoring, Query, Weight};
use tantivy::schema::Schema;
use tantivy::SegmentReader;

use crate::bitmap::DocBitmap;
use crate::chain::{ChainWeight, SerialChainFilter};
use crate::errors::SpatialResult;
use crate::index::IndexBinding;
use crate::predicate_query::SpatialPredicateQuery;
use crate::weight::PredicateWeight;

/// Late binding of a spatial index.
pub trait AttachIndex {
    /// Binds `binding` and the refinement mode to every predicate reachable
    /// from `self`.
    fn attach_index(&mut self, binding: &IndexBinding, envelope_only: bool);
}

/// Creation of a per-execution evaluator.
pub trait ProduceWeight {
    fn produce_weight(&self, schema: &Schema, scoring_enabled: bool) -> SpatialResult<FilterWeight>;
}

/// Production of the matching document set of one segment.
pub trait DocIdSetProducer {
    fn doc_id_set(&self, reader: &SegmentReader) -> SpatialResult<DocBitmap>;
}

/// A spatial predicate or a boolean chain of spatial filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpatialFilter {
    Predicate(SpatialPredicateQuery),
    Chain(SerialChainFilter),
}

/// Evaluator produced by a [`SpatialFilter`].
pub enum FilterWeight {
    Predicate(PredicateWeight),
    Chain(ChainWeight),
}

impl AttachIndex for SpatialPredicateQuery {
    fn attach_index(&mut self, binding: &IndexBinding, envelope_only: bool) {
        SpatialPredicateQuery::attach_index(self, binding, envelope_only);
    }
}

impl AttachIndex for SpatialFilter {
    fn attach_index(&mut self, binding: &IndexBinding, envelope_only: bool) {
        match self {
            SpatialFilter::Predicate(query) => AttachIndex::attach_index(query, binding, envelope_only),
            SpatialFilter::Chain(chain) => chain.attach_index(binding, envelope_only),
        }
    }
}

impl ProduceWeight for SpatialFilter {
    fn produce_weight(&self, schema: &Schema, scoring_enabled: bool) -> SpatialResult<FilterWeight> {
        match self {
            SpatialFilter::Predicate(query) => query
                .create_weight(schema, scoring_enabled)
                .map(FilterWeight::Predicate),
            SpatialFilter::Chain(chain) => chain
                .create_weight(schema, scoring_enabled)
                .map(FilterWeight::Chain),
        }
    }
}

impl DocIdSetProducer for FilterWeight {
    fn doc_id_set(&self, reader: &SegmentReader) -> SpatialResult<DocBitmap> {
        match self {
            FilterWeight::Predicate(weight) => weight.doc_bitmap(reader),
            FilterWeight::Chain(weight) => weight.doc_bitmap(reader),
        }
    }
}

impl From<SpatialPredicateQuery> for SpatialFilter {
    fn from(query: SpatialPredicateQuery) -> Self {
        SpatialFilter::Predicate(query)
    }
}

impl From<SerialChainFilter> for SpatialFilter {
    fn from(chain: SerialChainFilter) -> Self {
        SpatialFilter::Chain(chain)
    }
}

impl std::fmt::Display for SpatialFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpatialFilter::Predicate(query) => write!(f, "{}", query),
            SpatialFilter::Chain(chain) => write!(f, "{}", chain),
        }
    }
}

impl Query for SpatialFilter {
    fn weight(&self, enable_scoring: EnableScoring<'_>) -> tantivy::Result<Box<dyn Weight>> {
        match self {
            SpatialFilter::Predicate(query) => query.weight(enable_scoring),
            SpatialFilter::Chain(chain) => chain.weight(enable_scoring),
        }
    }
}
