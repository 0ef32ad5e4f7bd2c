//! Search request parsing and validation
//!
//! Turns the decoded query string of `GET /api/search` into a typed
//! [`SearchRequest`]. Validation never stops at the first problem: every
//! failing field is collected into [`ValidationErrors`] so the caller can fix
//! them all at once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_SORT_BY: &str = "date";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A validated search request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub db: Vec<String>,
    pub photographer: Vec<String>,
    pub page: u32,
    pub page_size: u32,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: None,
            db: Vec::new(),
            photographer: Vec::new(),
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: DEFAULT_SORT_BY.to_string(),
            sort_order: SortOrder::Desc,
            date_from: None,
            date_to: None,
        }
    }
}

/// Field-level validation errors, keyed by parameter name
///
/// Serializes as `{"page": ["..."], "page_size": ["..."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl SearchRequest {
    /// Parse a raw (still percent-encoded) query string
    pub fn from_query_string(query: &str) -> Result<Self, ValidationErrors> {
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    /// Validate decoded key/value pairs. Keys may repeat: `db` and
    /// `photographer` collect every occurrence, other keys keep the last one.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ValidationErrors>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw = RawParams::default();
        for (key, value) in pairs {
            raw.insert(key.as_ref(), value.as_ref());
        }
        raw.validate()
    }

    /// Free-text query, when it has anything besides whitespace
    pub fn text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

/// Parameters as received, before any type checks
#[derive(Debug, Default)]
struct RawParams {
    query: Option<String>,
    db: Vec<String>,
    photographer: Vec<String>,
    page: Option<String>,
    page_size: Option<String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
}

impl RawParams {
    fn insert(&mut self, key: &str, value: &str) {
        // Blank values count as absent for every parameter
        if value.trim().is_empty() {
            return;
        }
        let value = value.to_string();
        match key {
            "query" => self.query = Some(value),
            "db" => self.db.push(value),
            "photographer" => self.photographer.push(value),
            "page" => self.page = Some(value),
            "page_size" => self.page_size = Some(value),
            "sort_by" => self.sort_by = Some(value),
            "sort_order" => self.sort_order = Some(value),
            "date_from" => self.date_from = Some(value),
            "date_to" => self.date_to = Some(value),
            other => tracing::trace!("Ignoring unknown search parameter '{}'", other),
        }
    }

    fn validate(self) -> Result<SearchRequest, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let page = parse_bounded(&mut errors, "page", self.page.as_deref(), DEFAULT_PAGE, None);
        let page_size = parse_bounded(
            &mut errors,
            "page_size",
            self.page_size.as_deref(),
            DEFAULT_PAGE_SIZE,
            Some(MAX_PAGE_SIZE),
        );

        let sort_order = match self.sort_order.as_deref() {
            None => SortOrder::default(),
            Some(value) => SortOrder::parse(value.trim()).unwrap_or_else(|| {
                errors.add("sort_order", format!("\"{}\" is not a valid choice.", value));
                SortOrder::default()
            }),
        };

        let date_from = parse_date(&mut errors, "date_from", self.date_from.as_deref());
        let date_to = parse_date(&mut errors, "date_to", self.date_to.as_deref());

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(SearchRequest {
            query: self.query,
            db: self.db,
            photographer: self.photographer,
            page,
            page_size,
            sort_by: self
                .sort_by
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| DEFAULT_SORT_BY.to_string()),
            sort_order,
            date_from,
            date_to,
        })
    }
}

/// Parse a positive integer parameter. On failure the error is recorded and
/// the default is returned so validation can carry on with other fields.
fn parse_bounded(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    default: u32,
    max: Option<u32>,
) -> u32 {
    let Some(value) = value else {
        return default;
    };

    let Ok(parsed) = strip_zero_fraction(value.trim()).parse::<i64>() else {
        errors.add(field, "A valid integer is required.");
        return default;
    };

    if parsed < 1 {
        errors.add(field, "Ensure this value is greater than or equal to 1.");
        return default;
    }

    let upper = max.unwrap_or(u32::MAX);
    if parsed > i64::from(upper) {
        errors.add(
            field,
            format!("Ensure this value is less than or equal to {}.", upper),
        );
        return default;
    }

    parsed as u32
}

/// `"2.0"` and `"2."` are whole numbers; `"2.5"` is left for the parse to reject
fn strip_zero_fraction(value: &str) -> &str {
    match value.split_once('.') {
        Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole,
        _ => value,
    }
}

fn parse_date(errors: &mut ValidationErrors, field: &str, value: Option<&str>) -> Option<NaiveDate> {
    let value = value?;
    match NaiveDate::parse_from_str(value.trim(), DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(
                field,
                "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> Result<SearchRequest, ValidationErrors> {
        SearchRequest::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_defaults() {
        let req = parse(&[]).unwrap();
        assert_eq!(req, SearchRequest::default());
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, 20);
        assert_eq!(req.sort_by, "date");
        assert_eq!(req.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_valid_request() {
        let req = parse(&[
            ("query", "test"),
            ("page", "1"),
            ("page_size", "20"),
            ("sort_by", "date"),
            ("sort_order", "desc"),
        ])
        .unwrap();
        assert_eq!(req.query.as_deref(), Some("test"));
        assert_eq!(req.text(), Some("test"));
    }

    #[test]
    fn test_page_zero_and_page_size_too_large_both_reported() {
        let errors = parse(&[("page", "0"), ("page_size", "200")]).unwrap_err();
        assert!(errors.contains("page"));
        assert!(errors.contains("page_size"));
        assert_eq!(
            errors.get("page_size").unwrap(),
            ["Ensure this value is less than or equal to 100."]
        );
    }

    #[test]
    fn test_every_failing_field_reported() {
        let errors = parse(&[
            ("page", "abc"),
            ("page_size", "0"),
            ("sort_order", "sideways"),
            ("date_from", "2024-13-01"),
            ("date_to", "yesterday"),
        ])
        .unwrap_err();

        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(
            fields,
            vec!["date_from", "date_to", "page", "page_size", "sort_order"]
        );
        assert_eq!(errors.get("page").unwrap(), ["A valid integer is required."]);
        assert_eq!(
            errors.get("sort_order").unwrap(),
            ["\"sideways\" is not a valid choice."]
        );
    }

    #[test]
    fn test_page_size_bounds() {
        assert_eq!(parse(&[("page_size", "1")]).unwrap().page_size, 1);
        assert_eq!(parse(&[("page_size", "100")]).unwrap().page_size, 100);
        assert!(parse(&[("page_size", "101")]).is_err());
        assert!(parse(&[("page_size", "-5")]).is_err());
    }

    #[test]
    fn test_page_has_no_upper_bound_below_u32() {
        assert_eq!(parse(&[("page", "500000")]).unwrap().page, 500_000);
        assert!(parse(&[("page", "99999999999")]).unwrap_err().contains("page"));
    }

    #[test]
    fn test_repeated_filters_collected() {
        let req = parse(&[
            ("db", "st"),
            ("photographer", "John Doe"),
            ("db", "sp"),
            ("photographer", "Jane Smith"),
        ])
        .unwrap();
        assert_eq!(req.db, vec!["st", "sp"]);
        assert_eq!(req.photographer, vec!["John Doe", "Jane Smith"]);
    }

    #[test]
    fn test_single_valued_last_wins() {
        let req = parse(&[("page", "2"), ("page", "3")]).unwrap();
        assert_eq!(req.page, 3);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let req = parse(&[
            ("query", ""),
            ("db", "  "),
            ("date_from", ""),
            ("sort_by", ""),
            ("page", ""),
        ])
        .unwrap();
        assert_eq!(req.query, None);
        assert!(req.db.is_empty());
        assert_eq!(req.date_from, None);
        assert_eq!(req.sort_by, "date");
        assert_eq!(req.page, 1);
    }

    #[test]
    fn test_dates() {
        let req = parse(&[("date_from", "2024-01-01"), ("date_to", "2024-12-31")]).unwrap();
        assert_eq!(req.date_from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(req.date_to, NaiveDate::from_ymd_opt(2024, 12, 31));
    }

    #[test]
    fn test_long_query_accepted() {
        let long = "a".repeat(20_000);
        let req = parse(&[("query", long.as_str())]).unwrap();
        assert_eq!(req.text(), Some(long.as_str()));
    }

    #[test]
    fn test_integer_with_zero_fraction() {
        let req = parse(&[("page", "2.0"), ("page_size", "50.")]).unwrap();
        assert_eq!(req.page, 2);
        assert_eq!(req.page_size, 50);

        let errors = parse(&[("page", "2.5"), ("page_size", ".0")]).unwrap_err();
        assert_eq!(errors.get("page").unwrap(), ["A valid integer is required."]);
        assert_eq!(errors.get("page_size").unwrap(), ["A valid integer is required."]);
    }

    #[test]
    fn test_unknown_params_ignored() {
        assert!(parse(&[("format", "json"), ("_", "123")]).is_ok());
    }

    #[test]
    fn test_from_query_string_decodes() {
        let req = SearchRequest::from_query_string(
            "query=berlin+wall&db=st&db=sp&photographer=Jane%20Smith&sort_order=asc",
        )
        .unwrap();
        assert_eq!(req.query.as_deref(), Some("berlin wall"));
        assert_eq!(req.db, vec!["st", "sp"]);
        assert_eq!(req.photographer, vec!["Jane Smith"]);
        assert_eq!(req.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_text_ignores_whitespace_query() {
        let req = SearchRequest {
            query: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(req.text(), None);
    }

    #[test]
    fn test_validation_errors_display() {
        let errors = parse(&[("page", "0")]).unwrap_err();
        assert_eq!(
            errors.to_string(),
            "page: Ensure this value is greater than or equal to 1."
        );
    }
}
