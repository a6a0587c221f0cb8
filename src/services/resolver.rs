//! Playback resolution
//!
//! Entry point for the playback redirect handler: list the upstream
//! candidates, rank them, let the failover state pick an index into the
//! ranked pool and return that candidate's url.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::failover::FailoverManager;
use super::selector::{ResolutionSelector, SelectionMode};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::{PlaybackPath, PlaybackRequest};
use crate::sources::StreamSource;

/// Chosen stream for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub url: String,
    pub description: String,
    /// Position in the ranked pool
    pub index: usize,
    pub pool_size: usize,
    pub mode: SelectionMode,
}

pub struct PlaybackResolver {
    source: Arc<dyn StreamSource>,
    selector: ResolutionSelector,
    failover: Arc<FailoverManager>,
    timeout: Duration,
}

impl PlaybackResolver {
    pub fn new(
        source: Arc<dyn StreamSource>,
        failover: Arc<FailoverManager>,
        config: &Config,
    ) -> Self {
        Self {
            source,
            selector: ResolutionSelector::new(config.upstream.fallback_preference),
            failover,
            timeout: config.upstream.timeout,
        }
    }

    pub fn failover(&self) -> &Arc<FailoverManager> {
        &self.failover
    }

    /// Resolve a playback path as stored on a materialized item
    pub async fn resolve_path(&self, path: &str) -> AppResult<Resolution> {
        let path: PlaybackPath = path
            .parse()
            .map_err(|e| AppError::invariant(format!("invalid playback path '{path}': {e}")))?;
        self.resolve(&path.to_request()).await
    }

    pub async fn resolve(&self, request: &PlaybackRequest) -> AppResult<Resolution> {
        self.resolve_at(request, Instant::now()).await
    }

    /// Resolve with an explicit clock reading for the failover state
    pub async fn resolve_at(
        &self,
        request: &PlaybackRequest,
        now: Instant,
    ) -> AppResult<Resolution> {
        let key = request.key();

        let listed = tokio::time::timeout(
            self.timeout,
            self.source.list_streams(
                request.kind,
                &request.routing_key,
                request.season,
                request.episode,
            ),
        )
        .await
        .map_err(|_| {
            warn!("Stream source '{}' timed out for {}", self.source.name(), key);
            AppError::Timeout {
                operation: format!("list streams for {key}"),
                elapsed: self.timeout,
            }
        })?;

        let candidates = listed.map_err(|e| {
            warn!("Stream source '{}' failed for {}: {}", self.source.name(), key, e);
            AppError::from(e)
        })?;

        if candidates.is_empty() {
            info!("No streams available for {}", key);
            return Err(AppError::not_found("stream", key.to_string()));
        }

        let pool = self.selector.rank(&candidates, request.quality.as_deref());
        let requested = match pool.mode {
            SelectionMode::QualityMatch => request.index,
            SelectionMode::Discovery => None,
        };
        let index = self.failover.next_index(&key, requested, pool.len(), now);

        let chosen = pool
            .get_clamped(index)
            .ok_or_else(|| AppError::not_found("stream", key.to_string()))?;
        let index = index.min(pool.len() - 1);

        debug!(
            "Resolved {} to candidate {} of {} ({:?})",
            key,
            index,
            pool.len(),
            pool.mode
        );

        Ok(Resolution {
            url: chosen.url.clone(),
            description: chosen.description.clone(),
            index,
            pool_size: pool.len(),
            mode: pool.mode,
        })
    }
}
