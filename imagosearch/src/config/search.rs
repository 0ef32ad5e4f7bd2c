use serde::{Deserialize, Serialize};

/// Relevance and facet settings shared by the query compiler and the
/// aggregation fetcher
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchSettings {
    /// Boost applied to the description field in free-text matching
    #[serde(default = "default_description_boost")]
    pub description_boost: f32,
    /// Boost applied to the photographer field in free-text matching
    #[serde(default = "default_photographer_boost")]
    pub photographer_boost: f32,
    /// Per-search database facet size
    #[serde(default = "default_db_facet_size")]
    pub db_facet_size: usize,
    /// Per-search photographer facet size
    #[serde(default = "default_photographer_facet_size")]
    pub photographer_facet_size: usize,
    /// Global database facet size
    #[serde(default = "default_db_facet_size")]
    pub global_db_facet_size: usize,
    /// Global photographer facet size
    #[serde(default = "default_global_photographer_facet_size")]
    pub global_photographer_facet_size: usize,
}

fn default_description_boost() -> f32 {
    3.0
}

fn default_photographer_boost() -> f32 {
    2.0
}

fn default_db_facet_size() -> usize {
    10
}

fn default_photographer_facet_size() -> usize {
    20
}

fn default_global_photographer_facet_size() -> usize {
    10_000
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            description_boost: default_description_boost(),
            photographer_boost: default_photographer_boost(),
            db_facet_size: default_db_facet_size(),
            photographer_facet_size: default_photographer_facet_size(),
            global_db_facet_size: default_db_facet_size(),
            global_photographer_facet_size: default_global_photographer_facet_size(),
        }
    }
}
