//! External catalog entries (movies and series found through a metadata search)

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Kind of catalog content
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContentKind {
    Movie,
    #[strum(to_string = "series", serialize = "tv", serialize = "show")]
    Series,
}

/// A movie or series as returned by the metadata collaborator
///
/// Immutable once fetched. `seasons` is only populated by a details lookup
/// for series; search results leave it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub kind: ContentKind,
    pub external_id: i64,
    pub title: String,
    /// Cross-reference id (IMDb style), the preferred playback routing key
    #[serde(default)]
    pub cross_ref: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub backdrop: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub seasons: Vec<CatalogSeason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSeason {
    pub number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub episodes: Vec<CatalogEpisode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEpisode {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub air_date: Option<NaiveDate>,
    #[serde(default)]
    pub overview: Option<String>,
}

impl CatalogEntry {
    /// Minimal entry, mostly useful for tests and CLI input
    pub fn new(kind: ContentKind, external_id: i64, title: impl Into<String>) -> Self {
        Self {
            kind,
            external_id,
            title: title.into(),
            cross_ref: None,
            release_date: None,
            rating: None,
            overview: None,
            poster: None,
            backdrop: None,
            genres: Vec::new(),
            seasons: Vec::new(),
        }
    }

    pub fn with_cross_ref(mut self, cross_ref: impl Into<String>) -> Self {
        self.cross_ref = Some(cross_ref.into());
        self
    }

    /// Key used to route playback to the upstream source.
    ///
    /// Falls back to `tmdb:{external_id}` when the entry carries no
    /// cross-reference id.
    pub fn routing_key(&self) -> String {
        match self.cross_ref.as_deref().map(str::trim) {
            Some(xref) if !xref.is_empty() => xref.to_string(),
            _ => format!("tmdb:{}", self.external_id),
        }
    }

    pub fn production_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }
}
