//! External source abstractions
//!
//! Two collaborators feed this crate: a metadata catalog (search and
//! details) and a stream source that lists playable candidates for a title.

use async_trait::async_trait;

use crate::errors::SourceResult;
use crate::models::{CatalogEntry, ContentKind, StreamCandidate};

/// Upstream that lists playable streams, best match first
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Candidates for a title; `season`/`episode` are set for series episodes
    async fn list_streams(
        &self,
        kind: ContentKind,
        routing_key: &str,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> SourceResult<Vec<StreamCandidate>>;
}

/// Metadata catalog (TMDB style)
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Ranked search results; seasons are not populated
    async fn search(&self, term: &str, kind: ContentKind) -> SourceResult<Vec<CatalogEntry>>;

    /// Full entry, with nested seasons and episodes for series
    async fn details(&self, kind: ContentKind, external_id: i64) -> SourceResult<CatalogEntry>;
}
