//! Elasticsearch Query DSL types
//!
//! Only the subset of the DSL this service emits. The types serialize to the
//! exact JSON bodies sent to `/<index>/_search`.

use crate::request::SortOrder;
use serde::Serialize;
use std::collections::BTreeMap;

/// Body of a search request: bool query, pagination, sort and facets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub query: EsQuery,
    pub from: u64,
    pub size: u32,
    pub sort: Vec<SortClause>,
    pub aggs: BTreeMap<String, Aggregation>,
}

impl CompiledQuery {
    /// The bool clauses of the top-level query
    pub fn bool_query(&self) -> &BoolQuery {
        match &self.query {
            EsQuery::Bool(b) => b,
        }
    }
}

/// Body of an aggregation-only request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationQuery {
    pub size: u32,
    pub aggs: BTreeMap<String, Aggregation>,
}

/// Top-level query. The service always wraps its clauses in a bool query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EsQuery {
    Bool(BoolQuery),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolQuery {
    /// Scored clauses
    pub must: Vec<Clause>,
    /// Non-scored constraints
    pub filter: Vec<Clause>,
}

/// A single query clause
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// Weighted full-text match over several fields
    MultiMatch(MultiMatchQuery),

    /// Exact match on one value: `{"term": {"db": "st"}}`
    Term(BTreeMap<String, String>),

    /// Exact match on any of a set of values: `{"terms": {"db": ["st", "sp"]}}`
    Terms(BTreeMap<String, Vec<String>>),

    /// Inclusive range: `{"range": {"datum": {"gte": "...", "lte": "..."}}}`
    Range(BTreeMap<String, RangeBounds>),
}

impl Clause {
    pub fn term(field: &str, value: impl Into<String>) -> Self {
        Self::Term(BTreeMap::from([(field.to_string(), value.into())]))
    }

    pub fn terms(field: &str, values: Vec<String>) -> Self {
        Self::Terms(BTreeMap::from([(field.to_string(), values)]))
    }

    pub fn range(field: &str, bounds: RangeBounds) -> Self {
        Self::Range(BTreeMap::from([(field.to_string(), bounds)]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiMatchQuery {
    pub query: String,
    /// Field names with optional `^boost` suffix
    pub fields: Vec<String>,
    #[serde(rename = "type")]
    pub match_type: MultiMatchType,
    pub operator: Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiMatchType {
    BestFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    And,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeBounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
}

/// `{"<field>": {"order": "asc|desc"}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SortClause(BTreeMap<String, FieldSort>);

impl SortClause {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self(BTreeMap::from([(field.into(), FieldSort { order })]))
    }

    pub fn field(&self) -> &str {
        self.0.keys().next().map(String::as_str).unwrap_or_default()
    }

    pub fn order(&self) -> Option<SortOrder> {
        self.0.values().next().map(|s| s.order)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSort {
    pub order: SortOrder,
}

/// Aggregation request. Exactly one of the bucket kinds is set; `aggs` holds
/// sub-aggregations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<TermsAgg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalAgg>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aggs: BTreeMap<String, Aggregation>,
}

impl Aggregation {
    pub fn terms(terms: TermsAgg) -> Self {
        Self {
            terms: Some(terms),
            ..Default::default()
        }
    }

    /// A `global` bucket: sub-aggregations see every document in the index,
    /// regardless of the query
    pub fn global(aggs: BTreeMap<String, Aggregation>) -> Self {
        Self {
            global: Some(GlobalAgg {}),
            aggs,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermsAgg {
    pub field: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<BucketOrder>,
}

/// Serializes as `{}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalAgg {}

/// `{"_count": "desc"}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketOrder {
    #[serde(rename = "_count")]
    pub count: SortOrder,
}
