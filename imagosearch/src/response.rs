//! Response mapping from Elasticsearch to the external search schema
//!
//! Raw engine JSON is decoded into strict source types first; anything that
//! does not fit is a [`ShapeError`], which points at schema drift in the index
//! rather than at the caller.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Width of the zero-padded image number in media URLs
const IMAGE_NUMBER_WIDTH: usize = 10;

/// Build the small-format image URL for a record:
/// `<base>/bild/<db>/<10-digit image number>/s.jpg`
pub fn media_url(base_url: &str, db: &str, image_number: &str) -> String {
    format!(
        "{}/bild/{}/{}/s.jpg",
        base_url.trim_end_matches('/'),
        db,
        zero_pad(image_number, IMAGE_NUMBER_WIDTH)
    )
}

/// Left-pad with zeros to `width`, keeping a leading sign in front
fn zero_pad(value: &str, width: usize) -> String {
    match value.strip_prefix(['-', '+']) {
        Some(digits) => format!(
            "{}{:0>w$}",
            &value[..1],
            digits,
            w = width.saturating_sub(1)
        ),
        None => format!("{:0>w$}", value, w = width),
    }
}

/// The engine response did not have the expected shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    problems: Vec<(String, String)>,
}

impl ShapeError {
    pub fn new(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            problems: vec![(location.into(), reason.into())],
        }
    }

    fn push(&mut self, location: impl Into<String>, reason: impl Into<String>) {
        self.problems.push((location.into(), reason.into()));
    }

    /// `(location, reason)` pairs, one per offending element
    pub fn problems(&self) -> &[(String, String)] {
        &self.problems
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .problems
            .iter()
            .map(|(location, reason)| format!("{}: {}", location, reason))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ShapeError {}

// ---------------------------------------------------------------------------
// External schema
// ---------------------------------------------------------------------------

/// Search endpoint response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub total: u64,
    pub results: Vec<MediaHit>,
    pub aggregations: SearchAggregations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaHit {
    pub id: String,
    pub source: MediaSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaSource {
    pub image_number: String,
    #[serde(serialize_with = "serialize_utc")]
    pub date: DateTime<Utc>,
    pub search_text: String,
    pub photographers: Photographers,
    pub height: u32,
    pub width: u32,
    pub database: String,
    pub thumbnail_url: String,
}

/// Photographer credit as stored: a single string or a list of names
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Photographers {
    One(String),
    Many(Vec<String>),
}

/// Per-search facet counts
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SearchAggregations {
    #[serde(default)]
    pub db_terms: BucketList,
    #[serde(default)]
    pub photographer_terms: BucketList,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BucketList {
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

/// A facet value and its document count
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Bucket {
    pub key: Value,
    pub doc_count: u64,
}

fn serialize_utc<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

// ---------------------------------------------------------------------------
// Engine shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    hits: RawHits,
    #[serde(default)]
    aggregations: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawHits {
    #[serde(default)]
    total: Option<RawTotal>,
    #[serde(default)]
    hits: Vec<Value>,
}

/// `{"value": n, "relation": "eq"}` on current engines, a bare number on 6.x
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Object { value: u64 },
    Count(u64),
}

impl RawTotal {
    fn value(&self) -> u64 {
        match self {
            Self::Object { value } | Self::Count(value) => *value,
        }
    }
}

/// A hit or a document from the `_doc` endpoint
#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    _score: Option<f64>,
    #[serde(rename = "_source")]
    source: RawSource,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(deserialize_with = "string_or_number")]
    bildnummer: String,
    #[serde(deserialize_with = "engine_datetime")]
    datum: DateTime<Utc>,
    suchtext: String,
    fotografen: Photographers,
    #[serde(deserialize_with = "lenient_u32")]
    breite: u32,
    #[serde(deserialize_with = "lenient_u32")]
    hoehe: u32,
    db: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => Ok(s),
        StringOrNumber::Number(n) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
        StringOrNumber::Number(n) => Err(de::Error::custom(format!(
            "expected an integer image number, got {}",
            n
        ))),
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| de::Error::custom(format!("expected a pixel size, got {}", n))),
        StringOrNumber::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected a pixel size, got {:?}", s))),
    }
}

/// RFC 3339, or a naive ISO datetime taken as UTC
fn engine_datetime<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_engine_datetime(&raw)
        .ok_or_else(|| de::Error::custom(format!("expected an ISO-8601 datetime, got {:?}", raw)))
}

fn parse_engine_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Mapper
// ---------------------------------------------------------------------------

/// Maps raw engine payloads to the external schema
#[derive(Debug, Clone)]
pub struct ResponseMapper {
    media_base_url: String,
}

impl ResponseMapper {
    pub fn new(media_base_url: impl Into<String>) -> Self {
        Self {
            media_base_url: media_base_url.into(),
        }
    }

    /// Map a `_search` response. Every hit is checked; all bad hits are
    /// reported together.
    pub fn map_search(&self, raw: Value) -> Result<SearchResponse, ShapeError> {
        let raw: RawSearchResponse = serde_json::from_value(raw)
            .map_err(|e| ShapeError::new("response", e.to_string()))?;

        let mut errors: Option<ShapeError> = None;
        let mut results = Vec::with_capacity(raw.hits.hits.len());

        for (i, hit) in raw.hits.hits.into_iter().enumerate() {
            match serde_json::from_value::<RawHit>(hit) {
                Ok(hit) => results.push(self.map_hit(hit)),
                Err(e) => {
                    let location = format!("results[{}]", i);
                    match errors.as_mut() {
                        Some(errors) => errors.push(location, e.to_string()),
                        None => errors = Some(ShapeError::new(location, e.to_string())),
                    }
                }
            }
        }

        let aggregations = match raw.aggregations {
            Some(aggs) => serde_json::from_value::<SearchAggregations>(aggs).map_err(|e| {
                let e = e.to_string();
                match errors.take() {
                    Some(mut errors) => {
                        errors.push("aggregations", e);
                        errors
                    }
                    None => ShapeError::new("aggregations", e),
                }
            })?,
            None => SearchAggregations::default(),
        };

        if let Some(errors) = errors {
            return Err(errors);
        }

        Ok(SearchResponse {
            total: raw.hits.total.map(|t| t.value()).unwrap_or(0),
            results,
            aggregations,
        })
    }

    /// Map a single document as returned by `GET /<index>/_doc/<id>`
    pub fn map_document(&self, raw: Value) -> Result<MediaHit, ShapeError> {
        serde_json::from_value::<RawHit>(raw)
            .map(|hit| self.map_hit(hit))
            .map_err(|e| ShapeError::new("document", e.to_string()))
    }

    fn map_hit(&self, hit: RawHit) -> MediaHit {
        let source = hit.source;
        let thumbnail_url = media_url(&self.media_base_url, &source.db, &source.bildnummer);

        MediaHit {
            id: hit.id,
            source: MediaSource {
                image_number: source.bildnummer,
                date: source.datum,
                search_text: source.suchtext,
                photographers: source.fotografen,
                height: source.hoehe,
                width: source.breite,
                database: source.db,
                thumbnail_url,
            },
        }
    }
}
