//! Corpus-wide facet counts for filter options
//!
//! Runs an aggregation-only query whose facets sit under a `global` bucket,
//! so they always count the whole index and ignore any search filter.

use crate::config::SearchSettings;
use crate::engine::{EngineError, SearchEngine};
use crate::query::agg_names;
use crate::query::fields;
use crate::query::types::{Aggregation, AggregationQuery, BucketOrder, TermsAgg};
use crate::request::SortOrder;
use crate::response::{BucketList, ShapeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Facet counts over every document in the index
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GlobalAggregations {
    #[serde(default)]
    pub doc_count: u64,
    pub db_terms: BucketList,
    pub photographer_terms: BucketList,
}

impl GlobalAggregations {
    /// Map the raw `aggregations` object of a global facet query
    pub fn from_raw(raw: Value) -> Result<Self, ShapeError> {
        let all_docs = match raw {
            Value::Object(mut map) => map.remove(agg_names::ALL_DOCS),
            _ => None,
        }
        .ok_or_else(|| {
            ShapeError::new("aggregations", format!("missing `{}`", agg_names::ALL_DOCS))
        })?;

        serde_json::from_value(all_docs)
            .map_err(|e| ShapeError::new(agg_names::ALL_DOCS, e.to_string()))
    }
}

/// Issues the global facet query
#[derive(Debug, Clone, Default)]
pub struct AggregationFetcher {
    settings: SearchSettings,
}

impl AggregationFetcher {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings }
    }

    /// Zero-hit body with facets nested under a global scope
    pub fn query(&self) -> AggregationQuery {
        let by_count = Some(BucketOrder {
            count: SortOrder::Desc,
        });

        let facets = BTreeMap::from([
            (
                agg_names::DB_TERMS.to_string(),
                Aggregation::terms(TermsAgg {
                    field: fields::DATABASE.to_string(),
                    size: self.settings.global_db_facet_size,
                    order: by_count,
                }),
            ),
            (
                agg_names::PHOTOGRAPHER_TERMS.to_string(),
                Aggregation::terms(TermsAgg {
                    field: fields::PHOTOGRAPHERS.to_string(),
                    size: self.settings.global_photographer_facet_size,
                    order: by_count,
                }),
            ),
        ]);

        AggregationQuery {
            size: 0,
            aggs: BTreeMap::from([(agg_names::ALL_DOCS.to_string(), Aggregation::global(facets))]),
        }
    }

    /// Run the query and return the raw `aggregations` object
    pub async fn fetch(&self, engine: &dyn SearchEngine) -> Result<Value, EngineError> {
        let body = serde_json::to_value(self.query())?;
        let mut response = engine.search(&body).await?;

        Ok(response
            .get_mut("aggregations")
            .map(Value::take)
            .unwrap_or_else(|| Value::Object(Default::default())))
    }
}
