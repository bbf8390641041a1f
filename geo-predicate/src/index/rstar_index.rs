//! In-memory [`SpatialIndex`] over an `rstar` tree, with a matching
//! [`ElementMapper`].

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;

use super::{ElementMapper, InternalId, SpatialIndex};
use crate::crs::Crs;
use crate::envelope::{Envelope, NamedEnvelope};
use crate::errors::{SpatialError, SpatialResult};
use crate::predicate::SpatialPredicateType;

type Entry = GeomWithData<Rectangle<[f64; 2]>, InternalId>;

/// A read-only R*-tree bulk loaded from precomputed envelopes.
pub struct RStarSpatialIndex {
    tree: RTree<Entry>,
    crs: Crs,
}

impl RStarSpatialIndex {
    /// Bulk loads `(id, envelope)` pairs. Every envelope must be valid and
    /// expressed in `crs`.
    pub fn bulk_load<I>(entries: I, crs: Crs) -> SpatialResult<Self>
    where
        I: IntoIterator<Item = (InternalId, Envelope)>,
    {
        let mut items = Vec::new();
        for (id, envelope) in entries {
            if envelope.crs() != crs {
                return Err(SpatialError::ContractViolation(format!(
                    "entry {} is in {}, index is in {}",
                    id,
                    envelope.crs(),
                    crs
                )));
            }
            if !envelope.is_valid() {
                return Err(SpatialError::ContractViolation(format!(
                    "entry {} has an invalid envelope {}",
                    id, envelope
                )));
            }
            let rect = Rectangle::from_corners(
                [envelope.min_x, envelope.min_y],
                [envelope.max_x, envelope.max_y],
            );
            items.push(GeomWithData::new(rect, id));
        }
        log::debug!("Bulk loading {} envelopes into R-tree ({})", items.len(), crs);
        Ok(RStarSpatialIndex {
            tree: RTree::bulk_load(items),
            crs,
        })
    }

    /// Builds an index over every entry of `mapper`, using positions as ids.
    pub fn from_mapper(mapper: &MemoryElementMapper, crs: Crs) -> SpatialResult<Self> {
        Self::bulk_load(
            mapper
                .entries
                .iter()
                .enumerate()
                .map(|(id, entry)| (id as InternalId, *entry.envelope())),
            crs,
        )
    }

    fn entry_envelope(&self, entry: &Entry) -> Envelope {
        let rect = entry.geom();
        Envelope::new(
            rect.lower()[0],
            rect.lower()[1],
            rect.upper()[0],
            rect.upper()[1],
            self.crs,
        )
    }

    fn intersecting(&self, envelope: &Envelope) -> impl Iterator<Item = &Entry> + '_ {
        self.tree.locate_in_envelope_intersecting(&envelope.to_aabb())
    }

    fn check_crs(&self, envelope: &Envelope) -> SpatialResult<()> {
        if envelope.crs() != self.crs {
            return Err(SpatialError::IndexAccess(format!(
                "query envelope in {} does not match index {}",
                envelope.crs(),
                self.crs
            )));
        }
        Ok(())
    }
}

fn sorted(mut ids: Vec<InternalId>) -> Vec<InternalId> {
    ids.sort_unstable();
    ids
}

impl SpatialIndex for RStarSpatialIndex {
    fn search(&self, envelope: &Envelope) -> SpatialResult<Vec<InternalId>> {
        self.check_crs(envelope)?;
        Ok(sorted(self.intersecting(envelope).map(|e| e.data).collect()))
    }

    fn search_with_predicate(
        &self,
        envelope: &Envelope,
        predicate: SpatialPredicateType,
    ) -> SpatialResult<Vec<InternalId>> {
        self.check_crs(envelope)?;
        let ids = match predicate {
            SpatialPredicateType::Within => self
                .tree
                .locate_in_envelope(&envelope.to_aabb())
                .map(|e| e.data)
                .collect(),
            SpatialPredicateType::Contains => self
                .intersecting(envelope)
                .filter(|e| self.entry_envelope(e).contains(envelope))
                .map(|e| e.data)
                .collect(),
            SpatialPredicateType::Equals => self
                .intersecting(envelope)
                .filter(|e| &self.entry_envelope(e) == envelope)
                .map(|e| e.data)
                .collect(),
            _ => self.intersecting(envelope).map(|e| e.data).collect(),
        };
        Ok(sorted(ids))
    }

    fn crs(&self) -> Crs {
        self.crs
    }

    fn size(&self) -> u64 {
        self.tree.size() as u64
    }
}

/// Element mapper backed by a vector; the internal id of an entry is its
/// position.
#[derive(Debug, Clone, Default)]
pub struct MemoryElementMapper {
    entries: Vec<NamedEnvelope>,
}

impl MemoryElementMapper {
    pub fn new(entries: Vec<NamedEnvelope>) -> Self {
        MemoryElementMapper { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ElementMapper for MemoryElementMapper {
    fn id_for(&self, id: InternalId) -> SpatialResult<Option<NamedEnvelope>> {
        Ok(usize::try_from(id)
            .ok()
            .and_then(|idx| self.entries.get(idx))
            .cloned())
    }
}
