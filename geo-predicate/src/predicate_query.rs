use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tantivy::query::{EnableScoring, Query, Weight};
use tantivy::schema::Schema;

use crate::accessor::GeometryFieldAccessor;
use crate::config::SpatialConfig;
use crate::errors::SpatialResult;
use crate::index::IndexBinding;
use crate::predicate::SpatialPredicate;
use crate::weight::PredicateWeight;

/// A query wrapping a single spatial predicate.
///
/// The spatial index is late-bound with [`attach_index`](Self::attach_index)
/// before execution; without one the predicate is evaluated exactly against
/// every live document. Equality and hashing only consider the predicate, so
/// the same predicate with or without an index compares equal.
#[derive(Debug, Clone)]
pub struct SpatialPredicateQuery {
    predicate: Arc<SpatialPredicate>,
    binding: Option<IndexBinding>,
    envelope_only: bool,
    config: SpatialConfig,
}

impl SpatialPredicateQuery {
    pub fn wrap(predicate: SpatialPredicate) -> Self {
        SpatialPredicateQuery {
            predicate: Arc::new(predicate),
            binding: None,
            envelope_only: false,
            config: SpatialConfig::default(),
        }
    }

    /// Uses a snapshot of `config`; later changes to `config` do not reach
    /// this query.
    pub fn with_config(mut self, config: SpatialConfig) -> Self {
        self.config = config.snapshot();
        self
    }

    #[inline]
    pub fn predicate(&self) -> &SpatialPredicate {
        &self.predicate
    }

    #[inline]
    pub fn binding(&self) -> Option<&IndexBinding> {
        self.binding.as_ref()
    }

    #[inline]
    pub fn is_envelope_only(&self) -> bool {
        self.envelope_only
    }

    /// Binds the spatial index and refinement mode. Calling it again replaces
    /// the previous binding.
    pub fn attach_index(&mut self, binding: &IndexBinding, envelope_only: bool) {
        self.binding = Some(binding.clone());
        self.envelope_only = envelope_only;
    }

    /// Creates the weight evaluating this predicate over segments of `schema`.
    pub fn create_weight(&self, schema: &Schema, scoring_enabled: bool) -> SpatialResult<PredicateWeight> {
        let accessor = GeometryFieldAccessor::new(
            schema,
            &self.config.geometry_field(),
            &self.config.id_field(),
        )?;
        Ok(PredicateWeight::new(
            self.predicate.clone(),
            self.binding.clone(),
            self.envelope_only,
            accessor,
            self.config.reprojector(),
            self.config.store_cache_blocks(),
            scoring_enabled,
        ))
    }
}

impl PartialEq for SpatialPredicateQuery {
    fn eq(&self, other: &Self) -> bool {
        self.predicate == other.predicate
    }
}

impl Eq for SpatialPredicateQuery {}

impl Hash for SpatialPredicateQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.predicate.hash(state);
    }
}

impl fmt::Display for SpatialPredicateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.config.geometry_field(), self.predicate)
    }
}

impl Query for SpatialPredicateQuery {
    fn weight(&self, enable_scoring: EnableScoring<'_>) -> tantivy::Result<Box<dyn Weight>> {
        let weight = self.create_weight(enable_scoring.schema(), enable_scoring.is_scoring_enabled())?;
        Ok(Box::new(weight))
    }
}
