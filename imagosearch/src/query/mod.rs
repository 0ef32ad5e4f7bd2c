//! Query compilation from search requests to Elasticsearch Query DSL

mod compiler;
pub mod types;

pub use compiler::{physical_sort_field, QueryCompiler};
pub use types::{AggregationQuery, CompiledQuery};

/// Physical field names of a media record in the index
pub mod fields {
    pub const IMAGE_NUMBER: &str = "bildnummer";
    pub const DATE: &str = "datum";
    pub const SEARCH_TEXT: &str = "suchtext";
    pub const PHOTOGRAPHERS: &str = "fotografen";
    pub const WIDTH: &str = "breite";
    pub const HEIGHT: &str = "hoehe";
    pub const DATABASE: &str = "db";
}

/// Aggregation names shared by the compiler, the fetcher and the mappers
pub mod agg_names {
    pub const DB_TERMS: &str = "db_terms";
    pub const PHOTOGRAPHER_TERMS: &str = "photographer_terms";
    pub const ALL_DOCS: &str = "all_docs";
}
