//! Compiles a [`SearchRequest`] into a [`CompiledQuery`]

use super::agg_names;
use super::fields;
use super::types::*;
use crate::config::SearchSettings;
use crate::request::SearchRequest;
use std::collections::BTreeMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Map a logical sort name to the indexed field. Unknown names pass through.
pub fn physical_sort_field(logical: &str) -> &str {
    match logical {
        "date" => fields::DATE,
        "photographer" => fields::PHOTOGRAPHERS,
        "id" => fields::IMAGE_NUMBER,
        other => other,
    }
}

/// Builds engine queries from validated requests
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    settings: SearchSettings,
}

impl QueryCompiler {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings }
    }

    /// Compile a request. Total for any validated request.
    pub fn compile(&self, request: &SearchRequest) -> CompiledQuery {
        let mut bool_query = BoolQuery::default();

        if let Some(text) = request.text() {
            bool_query.must.push(self.text_clause(text));
        }

        if let Some(clause) = value_filter(fields::DATABASE, &request.db) {
            bool_query.filter.push(clause);
        }

        if request.date_from.is_some() || request.date_to.is_some() {
            let bounds = RangeBounds {
                gte: request.date_from.map(|d| d.format(DATE_FORMAT).to_string()),
                lte: request.date_to.map(|d| d.format(DATE_FORMAT).to_string()),
            };
            bool_query.filter.push(Clause::range(fields::DATE, bounds));
        }

        if let Some(clause) = value_filter(fields::PHOTOGRAPHERS, &request.photographer) {
            bool_query.filter.push(clause);
        }

        CompiledQuery {
            query: EsQuery::Bool(bool_query),
            from: u64::from(request.page.saturating_sub(1)) * u64::from(request.page_size),
            size: request.page_size,
            sort: vec![SortClause::new(
                physical_sort_field(&request.sort_by),
                request.sort_order,
            )],
            aggs: self.facet_aggregations(),
        }
    }

    fn text_clause(&self, text: &str) -> Clause {
        Clause::MultiMatch(MultiMatchQuery {
            query: text.to_string(),
            fields: vec![
                format!("{}^{}", fields::SEARCH_TEXT, self.settings.description_boost),
                format!("{}^{}", fields::PHOTOGRAPHERS, self.settings.photographer_boost),
            ],
            match_type: MultiMatchType::BestFields,
            operator: Operator::And,
        })
    }

    /// Facet counts scoped to the current result set
    fn facet_aggregations(&self) -> BTreeMap<String, Aggregation> {
        BTreeMap::from([
            (
                agg_names::DB_TERMS.to_string(),
                Aggregation::terms(TermsAgg {
                    field: fields::DATABASE.to_string(),
                    size: self.settings.db_facet_size,
                    order: None,
                }),
            ),
            (
                agg_names::PHOTOGRAPHER_TERMS.to_string(),
                Aggregation::terms(TermsAgg {
                    field: fields::PHOTOGRAPHERS.to_string(),
                    size: self.settings.photographer_facet_size,
                    order: None,
                }),
            ),
        ])
    }
}

/// `term` for one distinct value, `terms` for several, nothing for none.
/// Values are trimmed; blanks and duplicates are dropped.
fn value_filter(field: &str, values: &[String]) -> Option<Clause> {
    let mut distinct: Vec<String> = Vec::with_capacity(values.len());
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if !distinct.iter().any(|d| d == value) {
            distinct.push(value.to_string());
        }
    }

    match distinct.len() {
        0 => None,
        1 => distinct.pop().map(|v| Clause::term(field, v)),
        _ => Some(Clause::terms(field, distinct)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SortOrder;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use serde_json::json;

    fn compile(request: &SearchRequest) -> CompiledQuery {
        QueryCompiler::default().compile(request)
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_full_body() {
        let request = SearchRequest {
            query: Some("test".to_string()),
            ..Default::default()
        };

        let body = serde_json::to_value(compile(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "query": {"bool": {
                    "must": [{"multi_match": {
                        "query": "test",
                        "fields": ["suchtext^3", "fotografen^2"],
                        "type": "best_fields",
                        "operator": "and"
                    }}],
                    "filter": []
                }},
                "from": 0,
                "size": 20,
                "sort": [{"datum": {"order": "desc"}}],
                "aggs": {
                    "db_terms": {"terms": {"field": "db", "size": 10}},
                    "photographer_terms": {"terms": {"field": "fotografen", "size": 20}}
                }
            })
        );
    }

    #[test]
    fn test_long_query_reaches_multi_match() {
        let long = "wall ".repeat(4_000);
        let request = SearchRequest::from_pairs([("query", long.as_str())]).unwrap();

        let body = serde_json::to_value(compile(&request)).unwrap();
        assert_eq!(
            body["query"]["bool"]["must"][0]["multi_match"]["query"],
            json!(long.trim())
        );
    }

    #[test]
    fn test_no_filters_when_absent() {
        let compiled = compile(&SearchRequest::default());
        assert!(compiled.bool_query().filter.is_empty());
        assert!(compiled.bool_query().must.is_empty());
    }

    #[test]
    fn test_blank_query_adds_no_text_clause_even_with_filters() {
        let request = SearchRequest {
            query: Some("  ".to_string()),
            db: strings(&["st"]),
            ..Default::default()
        };
        let compiled = compile(&request);
        assert!(compiled.bool_query().must.is_empty());
        assert_eq!(compiled.bool_query().filter.len(), 1);
    }

    #[test]
    fn test_single_db_uses_term() {
        let request = SearchRequest {
            db: strings(&["st"]),
            ..Default::default()
        };
        assert_eq!(
            compile(&request).bool_query().filter,
            vec![Clause::term("db", "st")]
        );
    }

    #[test]
    fn test_multiple_db_uses_terms() {
        let request = SearchRequest {
            db: strings(&["st", "sp"]),
            ..Default::default()
        };
        assert_eq!(
            compile(&request).bool_query().filter,
            vec![Clause::terms("db", strings(&["st", "sp"]))]
        );
    }

    #[test]
    fn test_duplicates_and_blanks_collapse_to_term() {
        let request = SearchRequest {
            db: strings(&["st", " st ", ""]),
            ..Default::default()
        };
        assert_eq!(
            compile(&request).bool_query().filter,
            vec![Clause::term("db", "st")]
        );
    }

    #[test]
    fn test_only_blank_values_emit_nothing() {
        let request = SearchRequest {
            photographer: strings(&["", "   "]),
            ..Default::default()
        };
        assert!(compile(&request).bool_query().filter.is_empty());
    }

    #[test]
    fn test_db_and_photographer_filters() {
        let request = SearchRequest {
            db: strings(&["st"]),
            photographer: strings(&["John Doe"]),
            ..Default::default()
        };
        let compiled = compile(&request);
        assert_eq!(
            compiled.bool_query().filter,
            vec![
                Clause::term("db", "st"),
                Clause::term("fotografen", "John Doe"),
            ]
        );
    }

    #[test]
    fn test_date_range_fully_bounded() {
        let request = SearchRequest {
            date_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 31),
            ..Default::default()
        };
        let body = serde_json::to_value(&compile(&request).bool_query().filter).unwrap();
        assert_eq!(
            body,
            json!([{"range": {"datum": {"gte": "2024-01-01", "lte": "2024-03-31"}}}])
        );
    }

    #[test]
    fn test_date_range_upper_only() {
        let request = SearchRequest {
            date_to: NaiveDate::from_ymd_opt(1999, 12, 31),
            ..Default::default()
        };
        let body = serde_json::to_value(&compile(&request).bool_query().filter).unwrap();
        assert_eq!(body, json!([{"range": {"datum": {"lte": "1999-12-31"}}}]));
    }

    #[test]
    fn test_filter_order() {
        let request = SearchRequest {
            db: strings(&["st"]),
            photographer: strings(&["A", "B"]),
            date_from: NaiveDate::from_ymd_opt(2020, 5, 1),
            ..Default::default()
        };
        let compiled = compile(&request);
        let filter = &compiled.bool_query().filter;
        assert!(matches!(filter[0], Clause::Term(_)));
        assert!(matches!(filter[1], Clause::Range(_)));
        assert!(matches!(filter[2], Clause::Terms(_)));
    }

    #[test]
    fn test_sort_aliases() {
        assert_eq!(physical_sort_field("date"), "datum");
        assert_eq!(physical_sort_field("photographer"), "fotografen");
        assert_eq!(physical_sort_field("id"), "bildnummer");
        assert_eq!(physical_sort_field("breite"), "breite");
        assert_eq!(physical_sort_field("_score"), "_score");
    }

    #[test]
    fn test_sort_order_passthrough() {
        let request = SearchRequest {
            sort_by: "id".to_string(),
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let compiled = compile(&request);
        assert_eq!(compiled.sort.len(), 1);
        assert_eq!(compiled.sort[0].field(), "bildnummer");
        assert_eq!(compiled.sort[0].order(), Some(SortOrder::Asc));
    }

    #[test]
    fn test_custom_boosts_and_facet_sizes() {
        let settings = SearchSettings {
            description_boost: 5.0,
            photographer_boost: 1.5,
            db_facet_size: 3,
            photographer_facet_size: 7,
            ..Default::default()
        };
        let request = SearchRequest {
            query: Some("harbour".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(QueryCompiler::new(settings).compile(&request)).unwrap();
        assert_eq!(
            body["query"]["bool"]["must"][0]["multi_match"]["fields"],
            json!(["suchtext^5", "fotografen^1.5"])
        );
        assert_eq!(body["aggs"]["db_terms"]["terms"]["size"], json!(3));
        assert_eq!(body["aggs"]["photographer_terms"]["terms"]["size"], json!(7));
    }

    #[test]
    fn test_large_page_does_not_overflow() {
        let request = SearchRequest {
            page: u32::MAX,
            page_size: 100,
            ..Default::default()
        };
        assert_eq!(compile(&request).from, (u64::from(u32::MAX) - 1) * 100);
    }

    proptest! {
        #[test]
        fn prop_pagination(page in 1u32..=100_000, page_size in 1u32..=100) {
            let request = SearchRequest { page, page_size, ..Default::default() };
            let compiled = compile(&request);
            prop_assert_eq!(compiled.from, u64::from(page - 1) * u64::from(page_size));
            prop_assert_eq!(compiled.size, page_size);
        }

        #[test]
        fn prop_filter_shape(values in proptest::collection::vec("[a-z]{1,4}", 0..6)) {
            let request = SearchRequest { photographer: values.clone(), ..Default::default() };
            let filter = compile(&request).bool_query().filter.clone();

            let mut distinct = values.clone();
            distinct.sort();
            distinct.dedup();

            match distinct.len() {
                0 => prop_assert!(filter.is_empty()),
                1 => prop_assert_eq!(filter, vec![Clause::term("fotografen", distinct[0].clone())]),
                _ => {
                    prop_assert_eq!(filter.len(), 1);
                    let Clause::Terms(map) = &filter[0] else {
                        return Err(TestCaseError::fail("expected terms clause"));
                    };
                    let mut emitted = map["fotografen"].clone();
                    emitted.sort();
                    prop_assert_eq!(emitted, distinct);
                }
            }
        }

        #[test]
        fn prop_text_clause_iff_non_blank(query in "[ a-z]{0,8}") {
            let request = SearchRequest { query: Some(query.clone()), ..Default::default() };
            let compiled = compile(&request);
            prop_assert_eq!(compiled.bool_query().must.len(), usize::from(!query.trim().is_empty()));
        }
    }
}
