//! Search result bridging
//!
//! Search results are shown to the user long before one of them is picked
//! for insertion. Each result is cached under its primary identity so the
//! pick can be served without a second catalog query; a cache miss falls
//! back to a details lookup.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::metadata_cache::MetadataCache;
use crate::errors::{AppError, AppResult, SourceError};
use crate::models::{CatalogEntry, ContentKind};
use crate::sources::MetadataProvider;
use crate::utils::{ContentIdentity, IdentityGenerator};

/// One search result with the identity its primary item will get
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub identity: ContentIdentity,
    pub entry: CatalogEntry,
}

pub struct SearchBridge {
    provider: Arc<dyn MetadataProvider>,
    cache: MetadataCache,
    identities: IdentityGenerator,
    timeout: Duration,
}

impl SearchBridge {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        cache: MetadataCache,
        identities: IdentityGenerator,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            identities,
            timeout,
        }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Search the catalog and remember every result
    pub async fn search(&self, term: &str, kind: ContentKind) -> AppResult<Vec<SearchHit>> {
        let entries = self
            .bounded("search", self.provider.search(term, kind))
            .await?;

        let mut hits = Vec::with_capacity(entries.len());
        for entry in entries {
            let identity = self.identities.primary(entry.kind, entry.external_id);
            self.cache.put(identity, entry.clone()).await;
            hits.push(SearchHit { identity, entry });
        }
        debug!("Search '{}' ({}) returned {} results", term, kind, hits.len());
        Ok(hits)
    }

    /// Catalog entry for a picked result
    ///
    /// Cached movies are served as is. Series need their seasons, which
    /// search results do not carry, so a cached series without seasons is
    /// refreshed through a details lookup.
    pub async fn entry(
        &self,
        identity: &ContentIdentity,
        kind: ContentKind,
        external_id: i64,
    ) -> AppResult<CatalogEntry> {
        if let Some(cached) = self.cache.get(identity).await {
            let usable = cached.kind == kind
                && cached.external_id == external_id
                && (kind == ContentKind::Movie || !cached.seasons.is_empty());
            if usable {
                debug!("Metadata cache hit for {}", identity);
                return Ok(cached);
            }
        }

        debug!("Metadata cache miss for {}, querying details", identity);
        let entry = self
            .bounded("details", self.provider.details(kind, external_id))
            .await?;
        self.cache.put(*identity, entry.clone()).await;
        Ok(entry)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, SourceError>>,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(SourceError::Http { status: 404, .. })) => Err(AppError::not_found(
                "catalog entry",
                format!("{} {}", self.provider.name(), operation),
            )),
            Ok(Err(e)) => {
                warn!("Metadata provider '{}' {} failed: {}", self.provider.name(), operation, e);
                Err(e.into())
            }
            Err(_) => {
                warn!("Metadata provider '{}' {} timed out", self.provider.name(), operation);
                Err(AppError::Timeout {
                    operation: format!("metadata {operation}"),
                    elapsed: self.timeout,
                })
            }
        }
    }
}
