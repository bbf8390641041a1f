use roaring::RoaringBitmap;
use tantivy::fastfield::AliveBitSet;
use tantivy::DocId;

/// Per-segment document bitmap.
///
/// A `DocBitmap` always covers exactly the ordinals `0..max_doc` of one
/// segment. It is created fresh for every evaluation and owned by the thread
/// computing it; combinators consume their right-hand side so no buffer is
/// ever shared between producers.
#[derive(Debug, Clone, PartialEq)]
pub struct DocBitmap {
    bits: RoaringBitmap,
    max_doc: DocId,
}

impl DocBitmap {
    pub fn new(max_doc: DocId) -> Self {
        DocBitmap {
            bits: RoaringBitmap::new(),
            max_doc,
        }
    }

    /// A bitmap with every ordinal of the segment set.
    pub fn full(max_doc: DocId) -> Self {
        let mut bits = RoaringBitmap::new();
        bits.insert_range(0..max_doc);
        DocBitmap { bits, max_doc }
    }

    #[inline]
    pub fn max_doc(&self) -> DocId {
        self.max_doc
    }

    #[inline]
    pub fn insert(&mut self, doc: DocId) {
        debug_assert!(doc < self.max_doc);
        self.bits.insert(doc);
    }

    #[inline]
    pub fn contains(&self, doc: DocId) -> bool {
        self.bits.contains(doc)
    }

    pub fn len(&self) -> u64 {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Complements the bitmap over `0..max_doc`.
    pub fn flip(&mut self) {
        self.bits ^= DocBitmap::full(self.max_doc).bits;
    }

    pub fn and(&mut self, other: DocBitmap) {
        debug_assert_eq!(self.max_doc, other.max_doc);
        self.bits &= other.bits;
    }

    pub fn or(&mut self, other: DocBitmap) {
        debug_assert_eq!(self.max_doc, other.max_doc);
        self.bits |= other.bits;
    }

    pub fn xor(&mut self, other: DocBitmap) {
        debug_assert_eq!(self.max_doc, other.max_doc);
        self.bits ^= other.bits;
    }

    /// Clears every ordinal that is not alive. `None` means nothing is deleted.
    pub fn retain_live(&mut self, alive: Option<&AliveBitSet>) {
        if let Some(alive) = alive {
            let dead: RoaringBitmap = self.bits.iter().filter(|doc| !alive.is_alive(*doc)).collect();
            self.bits -= dead;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ {
        self.bits.iter()
    }

    pub(crate) fn into_bits(self) -> RoaringBitmap {
        self.bits
    }
}
