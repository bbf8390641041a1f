use roaring::bitmap::IntoIter;
use tantivy::query::Scorer;
use tantivy::{DocId, DocSet, Score, TERMINATED};

use crate::bitmap::DocBitmap;

/// Constant-score scorer over a computed [`DocBitmap`].
///
/// Documents come out in ascending ordinal order, once. The scorer is
/// positioned on its first document as soon as it is created.
pub struct BitmapScorer {
    docs: IntoIter,
    doc: DocId,
    remaining: u32,
    score: Score,
}

impl BitmapScorer {
    pub fn new(bitmap: DocBitmap, score: Score) -> Self {
        let size = bitmap.len().min(u64::from(u32::MAX)) as u32;
        let mut docs = bitmap.into_bits().into_iter();
        let doc = docs.next().unwrap_or(TERMINATED);
        BitmapScorer {
            docs,
            doc,
            remaining: size,
            score,
        }
    }
}

impl DocSet for BitmapScorer {
    fn advance(&mut self) -> DocId {
        if self.doc != TERMINATED {
            self.remaining = self.remaining.saturating_sub(1);
            self.doc = self.docs.next().unwrap_or(TERMINATED);
        }
        self.doc
    }

    fn doc(&self) -> DocId {
        self.doc
    }

    fn size_hint(&self) -> u32 {
        self.remaining
    }
}

impl Scorer for BitmapScorer {
    fn score(&mut self) -> Score {
        self.score
    }
}
