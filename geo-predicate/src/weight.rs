use std::collections::HashSet;
use std::sync::Arc;

use geo::Geometry;
use tantivy::query::{Explanation, Scorer, Weight};
use tantivy::{DocId, Score, SegmentReader, TantivyDocument, TantivyError};

use crate::accessor::GeometryFieldAccessor;
use crate::bitmap::DocBitmap;
use crate::codec::GeometryDecoder;
use crate::crs::{Crs, Reprojector};
use crate::errors::SpatialResult;
use crate::index::IndexBinding;
use crate::predicate::{SpatialPredicate, SpatialPredicateType};
use crate::scorer::BitmapScorer;

/// Per-execution evaluator of one spatial predicate.
///
/// For every segment it computes the bitmap of live documents matching the
/// predicate. When an index is attached, the index prunes the candidate set
/// and exact geometry tests refine it; without one, every live document is
/// tested exactly.
///
/// A weight holds no mutable state. Segment evaluations may run on several
/// threads at once, each with its own decoder and bitmap.
pub struct PredicateWeight {
    predicate: Arc<SpatialPredicate>,
    binding: Option<IndexBinding>,
    envelope_only: bool,
    accessor: GeometryFieldAccessor,
    reprojector: Arc<dyn Reprojector>,
    store_cache_blocks: usize,
    scoring_enabled: bool,
}

/// What a segment scan needs, resolved once per scan.
struct ScanPlan {
    crs: Crs,
    operand: Geometry<f64>,
    /// Record ids returned by the index, or `None` without an index.
    candidates: Option<HashSet<String>>,
}

impl PredicateWeight {
    pub(crate) fn new(
        predicate: Arc<SpatialPredicate>,
        binding: Option<IndexBinding>,
        envelope_only: bool,
        accessor: GeometryFieldAccessor,
        reprojector: Arc<dyn Reprojector>,
        store_cache_blocks: usize,
        scoring_enabled: bool,
    ) -> Self {
        PredicateWeight {
            predicate,
            binding,
            envelope_only,
            accessor,
            reprojector,
            store_cache_blocks,
            scoring_enabled,
        }
    }

    pub fn predicate(&self) -> &SpatialPredicate {
        &self.predicate
    }

    /// Computes the matching live documents of `reader`.
    pub fn doc_bitmap(&self, reader: &SegmentReader) -> SpatialResult<DocBitmap> {
        let plan = self.plan()?;
        let kind = self.predicate.kind();
        let reverse = kind.is_reverse();
        let needs_exact = !self.envelope_only || kind.is_distance_based();

        let store = reader.get_store_reader(self.store_cache_blocks)?;
        let alive = reader.alive_bitset();
        let mut decoder = GeometryDecoder::new();
        let mut bitmap = DocBitmap::new(reader.max_doc());

        for doc_id in 0..reader.max_doc() {
            if alive.is_some_and(|alive| !alive.is_alive(doc_id)) {
                continue;
            }
            let doc: TantivyDocument = store.get(doc_id)?;

            let matched = match (&plan.candidates, self.accessor.record_id(&doc)) {
                (Some(candidates), Some(record_id)) => {
                    let member = candidates.contains(record_id);
                    if needs_exact && member {
                        self.matches_exactly(&doc, &plan, &mut decoder)?
                    } else {
                        member != reverse
                    }
                }
                _ => self.matches_exactly(&doc, &plan, &mut decoder)?,
            };

            if matched {
                bitmap.insert(doc_id);
            }
        }

        log::debug!(
            "Spatial {} on segment {}: {} of {} documents matched ({} decoded, {} undecodable)",
            kind,
            reader.segment_id().short_uuid_string(),
            bitmap.len(),
            reader.num_docs(),
            decoder.decoded(),
            decoder.failed()
        );
        Ok(bitmap)
    }

    /// Resolves the evaluation reference system, the operand in it, and the
    /// index candidates.
    fn plan(&self) -> SpatialResult<ScanPlan> {
        let operand = self.predicate.operand();
        let reprojector = self.reprojector.as_ref();

        let Some(binding) = &self.binding else {
            let crs = operand.crs();
            return Ok(ScanPlan {
                crs,
                operand: operand.geometry_in(crs, reprojector)?,
                candidates: None,
            });
        };

        let index = binding.index();
        let crs = index.crs();
        let geometry = operand.geometry_in(crs, reprojector)?;
        let envelope = operand.envelope_in(crs, reprojector)?;
        let kind = self.predicate.kind();

        let ids = if kind.is_distance_based() {
            let distance = self.predicate.distance().map(|d| d.in_crs(crs)).unwrap_or(0.0);
            index.search(&envelope.buffered(distance))?
        } else if kind == SpatialPredicateType::Crosses || !self.envelope_only {
            index.search_with_predicate(&envelope, kind)?
        } else {
            index.search(&envelope)?
        };

        let mut candidates = HashSet::with_capacity(ids.len());
        for id in &ids {
            match binding.mapper().id_for(*id)? {
                Some(named) => {
                    candidates.insert(named.record_id().to_string());
                }
                None => log::warn!("Spatial index returned unknown entry {}, skipping", id),
            }
        }
        log::debug!(
            "Spatial index returned {} candidates for {} (envelope only: {})",
            candidates.len(),
            kind,
            self.envelope_only
        );

        Ok(ScanPlan {
            crs,
            operand: geometry,
            candidates: Some(candidates),
        })
    }

    /// Decodes the stored geometry of `doc` and tests the predicate exactly.
    ///
    /// A record whose geometry cannot be decoded is logged and treated as a
    /// non-match; every other failure is returned.
    fn matches_exactly(
        &self,
        doc: &TantivyDocument,
        plan: &ScanPlan,
        decoder: &mut GeometryDecoder,
    ) -> SpatialResult<bool> {
        let stored = match self.accessor.geometry(doc, decoder) {
            Ok(stored) => stored,
            Err(err) if err.is_recoverable() => {
                log::warn!(
                    "Skipping record {}: {}",
                    self.accessor.record_id(doc).unwrap_or("<unknown>"),
                    err
                );
                return Ok(false);
            }
            Err(err) => return Err(err),
        };
        let geometry = stored.reprojected(plan.crs, self.reprojector.as_ref())?;
        Ok(self.predicate.evaluate(&geometry, &plan.operand, plan.crs))
    }

    fn score(&self, boost: Score) -> Score {
        if self.scoring_enabled {
            boost
        } else {
            1.0
        }
    }
}

impl Weight for PredicateWeight {
    fn scorer(&self, reader: &SegmentReader, boost: Score) -> tantivy::Result<Box<dyn Scorer>> {
        let bitmap = self.doc_bitmap(reader)?;
        Ok(Box::new(BitmapScorer::new(bitmap, self.score(boost))))
    }

    fn explain(&self, reader: &SegmentReader, doc: DocId) -> tantivy::Result<Explanation> {
        let bitmap = self.doc_bitmap(reader)?;
        if !bitmap.contains(doc) {
            return Err(TantivyError::InvalidArgument(format!(
                "Document #({}) does not match {}",
                doc, self.predicate
            )));
        }
        Ok(Explanation::new_with_string(
            self.predicate.to_string(),
            self.score(1.0),
        ))
    }
}
