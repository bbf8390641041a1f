//! Top-level query pairing free text with spatial filtering.

use serde::{Deserialize, Serialize};
use tantivy::query::{AllQuery, BooleanQuery, EnableScoring, Occur, Query, QueryParser, Weight};
use tantivy::TantivyError;

use crate::chain::LogicalOperator;
use crate::errors::{SpatialError, SpatialResult};
use crate::filter::{AttachIndex, SpatialFilter};
use crate::index::IndexBinding;

/// A free-text query, parsed by the engine's query parser at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextQuery {
    query: String,
    default_fields: Vec<String>,
}

impl TextQuery {
    pub fn new(query: impl Into<String>, default_fields: Vec<String>) -> Self {
        TextQuery {
            query: query.into(),
            default_fields,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn default_fields(&self) -> &[String] {
        &self.default_fields
    }

    fn parse(&self, enable_scoring: &EnableScoring<'_>) -> tantivy::Result<Box<dyn Query>> {
        let schema = enable_scoring.schema();
        let fields = self
            .default_fields
            .iter()
            .map(|name| schema.get_field(name))
            .collect::<tantivy::Result<Vec<_>>>()?;
        let tokenizers = enable_scoring
            .searcher()
            .map(|searcher| searcher.index().tokenizers().clone())
            .unwrap_or_default();
        QueryParser::new(schema.clone(), fields, tokenizers)
            .parse_query(&self.query)
            .map_err(|e| TantivyError::InvalidArgument(format!("invalid text query '{}': {}", self.query, e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Value type a sort field is compared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortType {
    String,
    Int,
    Float,
    Double,
    Long,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
    pub kind: SortType,
}

impl SortKey {
    pub fn new(field: impl Into<String>, order: SortOrder, kind: SortType) -> Self {
        SortKey {
            field: field.into(),
            order,
            kind,
        }
    }
}

/// A free-text query, a spatial filter, the operator joining them, sort keys
/// and independent sub-queries.
///
/// Sort keys and sub-queries are carried for the caller; merging sub-query
/// results is not done here. Executing the query evaluates the text and
/// spatial parts joined by the operator:
///
/// | join          | text   | spatial   |
/// |---------------|--------|-----------|
/// | AND           | MUST   | MUST      |
/// | OR, DEFAULT   | SHOULD | SHOULD    |
/// | NOT           | MUST   | MUST NOT  |
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeSpatialQuery {
    text: Option<TextQuery>,
    spatial: Option<SpatialFilter>,
    join: LogicalOperator,
    sort: Vec<SortKey>,
    sub_queries: Vec<CompositeSpatialQuery>,
}

impl CompositeSpatialQuery {
    pub fn builder() -> CompositeSpatialQueryBuilder {
        CompositeSpatialQueryBuilder::default()
    }

    pub fn text(&self) -> Option<&TextQuery> {
        self.text.as_ref()
    }

    pub fn spatial(&self) -> Option<&SpatialFilter> {
        self.spatial.as_ref()
    }

    pub fn join(&self) -> LogicalOperator {
        self.join
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn sub_queries(&self) -> &[CompositeSpatialQuery] {
        &self.sub_queries
    }

    /// Builds the engine query joining the text and spatial parts.
    fn engine_query(&self, enable_scoring: &EnableScoring<'_>) -> tantivy::Result<Box<dyn Query>> {
        let text = self.text.as_ref().map(|t| t.parse(enable_scoring)).transpose()?;
        let spatial = self.spatial.clone().map(|s| Box::new(s) as Box<dyn Query>);

        let query: Box<dyn Query> = match (text, spatial, self.join) {
            (None, None, _) => Box::new(AllQuery),
            (None, Some(spatial), LogicalOperator::Not) => Box::new(BooleanQuery::new(vec![
                (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                (Occur::MustNot, spatial),
            ])),
            (Some(text), None, _) => text,
            (None, Some(spatial), _) => spatial,
            (Some(text), Some(spatial), join) => {
                let (text_occur, spatial_occur) = match join {
                    LogicalOperator::And => (Occur::Must, Occur::Must),
                    LogicalOperator::Or | LogicalOperator::Default => (Occur::Should, Occur::Should),
                    LogicalOperator::Not => (Occur::Must, Occur::MustNot),
                    LogicalOperator::Xor => {
                        return Err(SpatialError::ContractViolation(
                            "XOR cannot join a text query and a spatial filter".to_string(),
                        )
                        .into())
                    }
                };
                Box::new(BooleanQuery::new(vec![(text_occur, text), (spatial_occur, spatial)]))
            }
        };
        Ok(query)
    }
}

impl AttachIndex for CompositeSpatialQuery {
    /// Attaches the index to the spatial filter and, recursively, to every
    /// sub-query. The text query is never touched.
    fn attach_index(&mut self, binding: &IndexBinding, envelope_only: bool) {
        if let Some(spatial) = &mut self.spatial {
            spatial.attach_index(binding, envelope_only);
        }
        for sub_query in &mut self.sub_queries {
            sub_query.attach_index(binding, envelope_only);
        }
    }
}

impl Query for CompositeSpatialQuery {
    fn weight(&self, enable_scoring: EnableScoring<'_>) -> tantivy::Result<Box<dyn Weight>> {
        self.engine_query(&enable_scoring)?.weight(enable_scoring)
    }
}

/// Builder for [`CompositeSpatialQuery`].
#[derive(Debug, Default)]
pub struct CompositeSpatialQueryBuilder {
    text: Option<TextQuery>,
    spatial: Option<SpatialFilter>,
    join: Option<LogicalOperator>,
    sort: Vec<SortKey>,
    sub_queries: Vec<CompositeSpatialQuery>,
}

impl CompositeSpatialQueryBuilder {
    pub fn text<S: Into<String>>(mut self, query: impl Into<String>, default_fields: Vec<S>) -> Self {
        self.text = Some(TextQuery::new(
            query,
            default_fields.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn spatial(mut self, filter: impl Into<SpatialFilter>) -> Self {
        self.spatial = Some(filter.into());
        self
    }

    pub fn join(mut self, join: LogicalOperator) -> Self {
        self.join = Some(join);
        self
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn sub_query(mut self, query: CompositeSpatialQuery) -> Self {
        self.sub_queries.push(query);
        self
    }

    pub fn build(self) -> SpatialResult<CompositeSpatialQuery> {
        let join = self.join.unwrap_or(LogicalOperator::And);
        if join == LogicalOperator::Xor {
            return Err(SpatialError::ContractViolation(
                "XOR cannot join a text query and a spatial filter".to_string(),
            ));
        }
        Ok(CompositeSpatialQuery {
            text: self.text,
            spatial: self.spatial,
            join,
            sort: self.sort,
            sub_queries: self.sub_queries,
        })
    }
}
