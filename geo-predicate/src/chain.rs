//! Boolean composition of spatial filters.

use std::fmt;

use serde::{Deserialize, Serialize};
use tantivy::query::{EnableScoring, Explanation, Query, Scorer, Weight};
use tantivy::schema::Schema;
use tantivy::{DocId, Score, SegmentReader, TantivyError};

use crate::bitmap::DocBitmap;
use crate::errors::{SpatialError, SpatialResult};
use crate::filter::{AttachIndex, DocIdSetProducer, FilterWeight, ProduceWeight, SpatialFilter};
use crate::index::IndexBinding;
use crate::scorer::BitmapScorer;

/// Operator joining two filters of a chain, or negating the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    And,
    Or,
    Xor,
    Not,
    /// Same as [`LogicalOperator::Or`].
    Default,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or | LogicalOperator::Default => "OR",
            LogicalOperator::Xor => "XOR",
            LogicalOperator::Not => "NOT",
        };
        f.write_str(name)
    }
}

/// Filters combined strictly left to right.
///
/// Operators follow the filters as they would read in infix form:
///
/// ```text
/// [NOT] F0 (op [NOT] Fi)*      op in {AND, OR, XOR, DEFAULT}
/// ```
///
/// So `[F1, F2, F3]` with `[AND, OR]` is `(F1 AND F2) OR F3`, and `[F]` with
/// `[NOT]` is the complement of `F`. Documents that are not alive are
/// removed from the final result whatever the operators were.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialChainFilter {
    filters: Vec<SpatialFilter>,
    operators: Vec<LogicalOperator>,
}

impl SerialChainFilter {
    /// Creates a chain, rejecting operator lists that do not fit `filters`.
    pub fn new(filters: Vec<SpatialFilter>, operators: Vec<LogicalOperator>) -> SpatialResult<Self> {
        validate_layout(filters.len(), &operators)?;
        Ok(SerialChainFilter { filters, operators })
    }

    pub fn filters(&self) -> &[SpatialFilter] {
        &self.filters
    }

    pub fn operators(&self) -> &[LogicalOperator] {
        &self.operators
    }

    pub fn create_weight(&self, schema: &Schema, scoring_enabled: bool) -> SpatialResult<ChainWeight> {
        let weights = self
            .filters
            .iter()
            .map(|filter| filter.produce_weight(schema, scoring_enabled))
            .collect::<SpatialResult<Vec<_>>>()?;
        Ok(ChainWeight {
            weights,
            operators: self.operators.clone(),
            scoring_enabled,
        })
    }
}

/// Walks the operator layout for `filter_count` filters.
fn validate_layout(filter_count: usize, operators: &[LogicalOperator]) -> SpatialResult<()> {
    if filter_count == 0 {
        return Err(SpatialError::ContractViolation(
            "a filter chain needs at least one filter".to_string(),
        ));
    }

    let mut cursor = 0;
    if operators.first() == Some(&LogicalOperator::Not) {
        cursor += 1;
    }
    for i in 1..filter_count {
        match operators.get(cursor) {
            None => {
                return Err(SpatialError::ContractViolation(format!(
                    "{} filters need at least {} operators, got {}",
                    filter_count,
                    filter_count - 1,
                    operators.len()
                )))
            }
            Some(LogicalOperator::Not) => {
                return Err(SpatialError::ContractViolation(format!(
                    "operator {} before filter {} must be binary, got NOT",
                    cursor, i
                )))
            }
            Some(_) => cursor += 1,
        }
        if operators.get(cursor) == Some(&LogicalOperator::Not) {
            cursor += 1;
        }
    }

    if cursor != operators.len() {
        return Err(SpatialError::ContractViolation(format!(
            "{} operators left over after {} filters",
            operators.len() - cursor,
            filter_count
        )));
    }
    Ok(())
}

impl AttachIndex for SerialChainFilter {
    fn attach_index(&mut self, binding: &IndexBinding, envelope_only: bool) {
        for filter in &mut self.filters {
            filter.attach_index(binding, envelope_only);
        }
    }
}

impl fmt::Display for SerialChainFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ops = self.operators.iter().peekable();
        write!(f, "(")?;
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                if let Some(op) = ops.next() {
                    write!(f, " {} ", op)?;
                }
            }
            if ops.next_if_eq(&&LogicalOperator::Not).is_some() {
                write!(f, "NOT ")?;
            }
            write!(f, "{}", filter)?;
        }
        write!(f, ")")
    }
}

impl Query for SerialChainFilter {
    fn weight(&self, enable_scoring: EnableScoring<'_>) -> tantivy::Result<Box<dyn Weight>> {
        let weight = self.create_weight(enable_scoring.schema(), enable_scoring.is_scoring_enabled())?;
        Ok(Box::new(weight))
    }
}

/// Evaluator of a [`SerialChainFilter`].
pub struct ChainWeight {
    weights: Vec<FilterWeight>,
    operators: Vec<LogicalOperator>,
    scoring_enabled: bool,
}

impl ChainWeight {
    /// Folds the sub-filter bitmaps of `reader` left to right.
    pub fn doc_bitmap(&self, reader: &SegmentReader) -> SpatialResult<DocBitmap> {
        let (first, rest) = self.weights.split_first().ok_or_else(|| {
            SpatialError::ContractViolation("a filter chain needs at least one filter".to_string())
        })?;

        let mut cursor = 0;
        let mut result = first.doc_id_set(reader)?;
        if self.operators.first() == Some(&LogicalOperator::Not) {
            result.flip();
            cursor += 1;
        }

        for weight in rest {
            let op = self.operators.get(cursor).copied().ok_or_else(|| {
                SpatialError::ContractViolation(format!("missing operator at {}", cursor))
            })?;
            cursor += 1;

            let mut next = weight.doc_id_set(reader)?;
            if self.operators.get(cursor) == Some(&LogicalOperator::Not) {
                next.flip();
                cursor += 1;
            }

            match op {
                LogicalOperator::And => result.and(next),
                LogicalOperator::Or | LogicalOperator::Default => result.or(next),
                LogicalOperator::Xor => result.xor(next),
                LogicalOperator::Not => {
                    return Err(SpatialError::ContractViolation(format!(
                        "operator {} must be binary, got NOT",
                        cursor - 1
                    )))
                }
            }
        }

        result.retain_live(reader.alive_bitset());
        Ok(result)
    }

    fn score(&self, boost: Score) -> Score {
        if self.scoring_enabled {
            boost
        } else {
            1.0
        }
    }
}

impl DocIdSetProducer for ChainWeight {
    fn doc_id_set(&self, reader: &SegmentReader) -> SpatialResult<DocBitmap> {
        self.doc_bitmap(reader)
    }
}

impl Weight for ChainWeight {
    fn scorer(&self, reader: &SegmentReader, boost: Score) -> tantivy::Result<Box<dyn Scorer>> {
        let bitmap = self.doc_bitmap(reader)?;
        Ok(Box::new(BitmapScorer::new(bitmap, self.score(boost))))
    }

    fn explain(&self, reader: &SegmentReader, doc: DocId) -> tantivy::Result<Explanation> {
        let bitmap = self.doc_bitmap(reader)?;
        if !bitmap.contains(doc) {
            return Err(TantivyError::InvalidArgument(format!(
                "Document #({}) does not match the filter chain",
                doc
            )));
        }
        Ok(Explanation::new("SerialChainFilter", self.score(1.0)))
    }
}
