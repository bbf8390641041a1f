//! Read-only spatial index contracts.
//!
//! The evaluator never builds or mutates an index; it consumes one through
//! [`SpatialIndex`] and resolves hits through [`ElementMapper`].

mod rstar_index;

use std::fmt;
use std::sync::Arc;

use crate::crs::Crs;
use crate::envelope::{Envelope, NamedEnvelope};
use crate::errors::SpatialResult;
use crate::predicate::SpatialPredicateType;

pub use rstar_index::{MemoryElementMapper, RStarSpatialIndex};

/// Identifier of an entry inside a spatial index.
pub type InternalId = u64;

/// A pre-built spatial index over record envelopes.
///
/// Implementations are shared between segment evaluations running on
/// different threads and must tolerate concurrent reads.
pub trait SpatialIndex: Send + Sync {
    /// Ids of entries whose envelope intersects `envelope`, ascending.
    fn search(&self, envelope: &Envelope) -> SpatialResult<Vec<InternalId>>;

    /// Ids of entries whose envelope stands in the relation implied by
    /// `predicate` with `envelope`.
    ///
    /// For reverse predicates (disjoint, beyond) the returned ids are the
    /// entries that may fail the predicate; every entry left out satisfies it.
    fn search_with_predicate(
        &self,
        envelope: &Envelope,
        predicate: SpatialPredicateType,
    ) -> SpatialResult<Vec<InternalId>>;

    /// Reference system of the indexed envelopes.
    fn crs(&self) -> Crs;

    /// Number of indexed entries.
    fn size(&self) -> u64;
}

/// Maps internal index ids back to record identifiers and envelopes.
pub trait ElementMapper: Send + Sync {
    /// Returns the entry for `id`, or `None` if the id is unknown.
    fn id_for(&self, id: InternalId) -> SpatialResult<Option<NamedEnvelope>>;
}

/// A spatial index together with the mapper resolving its ids.
#[derive(Clone)]
pub struct IndexBinding {
    index: Arc<dyn SpatialIndex>,
    mapper: Arc<dyn ElementMapper>,
}

impl IndexBinding {
    pub fn new(index: Arc<dyn SpatialIndex>, mapper: Arc<dyn ElementMapper>) -> Self {
        IndexBinding { index, mapper }
    }

    #[inline]
    pub fn index(&self) -> &dyn SpatialIndex {
        self.index.as_ref()
    }

    #[inline]
    pub fn mapper(&self) -> &dyn ElementMapper {
        self.mapper.as_ref()
    }
}

impl fmt::Debug for IndexBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexBinding")
            .field("crs", &self.index.crs())
            .field("size", &self.index.size())
            .finish()
    }
}
