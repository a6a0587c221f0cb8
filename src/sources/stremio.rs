//! Stremio addon protocol stream source
//!
//! Streams are listed with `GET {base}/stream/{type}/{id}.json`, where `id`
//! is `{routing_key}` for movies and `{routing_key}:{season}:{episode}` for
//! series episodes. The response is `{"streams": [...]}`; entries without a
//! direct `url` (torrent-only entries) are skipped.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::traits::StreamSource;
use crate::errors::{SourceError, SourceResult};
use crate::models::{ContentKind, StreamCandidate};

const SOURCE_TYPE: &str = "stremio";

/// HTTP stream source speaking the Stremio addon protocol
pub struct StremioStreamSource {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    #[serde(default)]
    streams: Vec<RawStream>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl RawStream {
    fn into_candidate(self) -> Option<StreamCandidate> {
        let url = self.url.filter(|u| !u.trim().is_empty())?;
        let description = [self.name, self.title, self.description]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" | ");
        Some(StreamCandidate::new(description, url))
    }
}

impl StremioStreamSource {
    /// `base_url` may point at the addon root or at its `manifest.json`
    pub fn new(base_url: &str, timeout: Duration) -> SourceResult<Self> {
        let trimmed = base_url
            .trim()
            .trim_end_matches('/')
            .trim_end_matches("/manifest.json");
        let base_url = Url::parse(&format!("{trimmed}/")).map_err(|e| SourceError::InvalidConfig {
            field: "upstream.base_url".to_string(),
            message: e.to_string(),
        })?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Endpoint for one title
    pub fn stream_url(
        &self,
        kind: ContentKind,
        routing_key: &str,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> SourceResult<Url> {
        let id = match (kind, season, episode) {
            (ContentKind::Series, Some(season), Some(episode)) => {
                format!("{routing_key}:{season}:{episode}")
            }
            _ => routing_key.to_string(),
        };
        self.base_url
            .join(&format!("stream/{kind}/{id}.json"))
            .map_err(|e| SourceError::InvalidConfig {
                field: "routing_key".to_string(),
                message: e.to_string(),
            })
    }

    fn parse_streams(body: &str) -> SourceResult<Vec<StreamCandidate>> {
        let response: StreamsResponse = serde_json::from_str(body)
            .map_err(|e| SourceError::parse(SOURCE_TYPE, e.to_string()))?;
        Ok(response
            .streams
            .into_iter()
            .filter_map(RawStream::into_candidate)
            .collect())
    }
}

#[async_trait]
impl StreamSource for StremioStreamSource {
    fn name(&self) -> &str {
        SOURCE_TYPE
    }

    async fn list_streams(
        &self,
        kind: ContentKind,
        routing_key: &str,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> SourceResult<Vec<StreamCandidate>> {
        let url = self.stream_url(kind, routing_key, season, episode)?;
        debug!("Listing streams from {}", url.path());

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout {
                    url: url.path().to_string(),
                }
            } else {
                SourceError::Request(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Stream source returned {} for {}", status, url.path());
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body = response.text().await?;
        let candidates = Self::parse_streams(&body)?;
        debug!("Stream source listed {} playable candidates", candidates.len());
        Ok(candidates)
    }
}
