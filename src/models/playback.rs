//! Playback paths, requests and upstream stream candidates

use serde::{Deserialize, Serialize};
use url::Url;

use super::catalog::ContentKind;
use super::quality::QualityTag;

/// Playback locator stored on a materialized item
///
/// Formats as `{namespace}://{kind}/{routing_key}[/{season}/{episode}][?quality=..&index=..]`.
/// The routing key is percent-encoded as a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaybackPath {
    pub namespace: String,
    pub kind: ContentKind,
    pub routing_key: String,
    pub episode: Option<EpisodeRef>,
    pub quality: Option<QualityTag>,
    pub index: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub season: u32,
    pub episode: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackPathError {
    #[error("Invalid playback URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Unsupported content kind: {0}")]
    Kind(String),
    #[error("Missing routing key")]
    MissingRoutingKey,
    #[error("Invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

impl PlaybackPath {
    pub fn new(
        namespace: impl Into<String>,
        kind: ContentKind,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            kind,
            routing_key: routing_key.into(),
            episode: None,
            quality: None,
            index: None,
        }
    }

    pub fn with_episode(mut self, season: u32, episode: u32) -> Self {
        self.episode = Some(EpisodeRef { season, episode });
        self
    }

    /// Attach a version; the clean tag leaves the path unversioned
    pub fn with_version(mut self, quality: QualityTag, index: u32) -> Self {
        if !quality.is_clean() {
            self.quality = Some(quality);
            self.index = Some(index);
        }
        self
    }

    /// Request that resolves this path
    pub fn to_request(&self) -> PlaybackRequest {
        PlaybackRequest {
            kind: self.kind,
            routing_key: self.routing_key.clone(),
            season: self.episode.map(|e| e.season),
            episode: self.episode.map(|e| e.episode),
            quality: self.quality.map(|q| q.to_string()),
            index: self.index.map(|i| i as usize),
        }
    }

    fn to_url(&self) -> Result<Url, PlaybackPathError> {
        let mut url = Url::parse(&format!("{}://{}/", self.namespace, self.kind))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| PlaybackPathError::MissingRoutingKey)?;
            segments.clear().push(&self.routing_key);
            if let Some(episode) = self.episode {
                segments
                    .push(&episode.season.to_string())
                    .push(&episode.episode.to_string());
            }
        }
        if let Some(quality) = self.quality {
            url.query_pairs_mut()
                .append_pair("quality", &quality.to_string())
                .append_pair("index", &self.index.unwrap_or(0).to_string());
        }
        Ok(url)
    }
}

impl std::fmt::Display for PlaybackPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_url() {
            Ok(url) => f.write_str(url.as_str()),
            Err(_) => write!(f, "{}://{}/{}", self.namespace, self.kind, self.routing_key),
        }
    }
}

impl std::str::FromStr for PlaybackPath {
    type Err = PlaybackPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s)?;
        let kind_raw = url.host_str().unwrap_or_default();
        let kind: ContentKind = kind_raw
            .parse()
            .map_err(|_| PlaybackPathError::Kind(kind_raw.to_string()))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        let raw_key = segments
            .first()
            .ok_or(PlaybackPathError::MissingRoutingKey)?;
        let routing_key = urlencoding::decode(raw_key)
            .map_err(|_| PlaybackPathError::InvalidField {
                field: "routing key",
                value: raw_key.to_string(),
            })?
            .into_owned();

        let mut path = PlaybackPath::new(url.scheme(), kind, routing_key);

        if let [_, season, episode, ..] = segments.as_slice() {
            path = path.with_episode(
                parse_number("season", season)?,
                parse_number("episode", episode)?,
            );
        }

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "quality" => {
                    let quality: QualityTag =
                        value.parse().map_err(|_| PlaybackPathError::InvalidField {
                            field: "quality",
                            value: value.to_string(),
                        })?;
                    if !quality.is_clean() {
                        path.quality = Some(quality);
                    }
                }
                "index" => path.index = Some(parse_number("index", &value)?),
                _ => {}
            }
        }

        if path.quality.is_none() {
            path.index = None;
        }

        Ok(path)
    }
}

fn parse_number(field: &'static str, value: &str) -> Result<u32, PlaybackPathError> {
    value.parse().map_err(|_| PlaybackPathError::InvalidField {
        field,
        value: value.to_string(),
    })
}

impl Serialize for PlaybackPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PlaybackPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One playback resolution request as issued by the redirect handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackRequest {
    pub kind: ContentKind,
    pub routing_key: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub quality: Option<String>,
    pub index: Option<usize>,
}

impl PlaybackRequest {
    pub fn movie(routing_key: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Movie,
            routing_key: routing_key.into(),
            season: None,
            episode: None,
            quality: None,
            index: None,
        }
    }

    pub fn episode(routing_key: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            kind: ContentKind::Series,
            routing_key: routing_key.into(),
            season: Some(season),
            episode: Some(episode),
            quality: None,
            index: None,
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Key scoping failover state to "the thing being played"
    pub fn key(&self) -> PlaybackKey {
        PlaybackKey {
            kind: self.kind,
            routing_key: self.routing_key.clone(),
            season: self.season,
            episode: self.episode,
            quality: self
                .quality
                .as_deref()
                .map(|q| q.trim().to_ascii_lowercase())
                .filter(|q| !q.is_empty()),
        }
    }
}

/// Logical-playback key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaybackKey {
    pub kind: ContentKind,
    pub routing_key: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub quality: Option<String>,
}

impl std::fmt::Display for PlaybackKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.routing_key)?;
        if let (Some(season), Some(episode)) = (self.season, self.episode) {
            write!(f, "/s{season}e{episode}")?;
        }
        write!(f, "/{}", self.quality.as_deref().unwrap_or("auto"))
    }
}

/// One stream offered by the upstream source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCandidate {
    /// Free-text description (release name, quality, size, ...)
    pub description: String,
    pub url: String,
}

impl StreamCandidate {
    pub fn new(description: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_movie_path() {
        let path = PlaybackPath::new("vodresolve", ContentKind::Movie, "tt0133093");
        assert_eq!(path.to_string(), "vodresolve://movie/tt0133093");

        let parsed: PlaybackPath = path.to_string().parse().unwrap();
        assert_eq!(parsed, path);
    }

    #[test]
    fn test_versioned_movie_path() {
        let path = PlaybackPath::new("vodresolve", ContentKind::Movie, "tt0133093")
            .with_version(QualityTag::FullHd, 1);
        assert_eq!(path.to_string(), "vodresolve://movie/tt0133093?quality=1080p&index=1");

        let request = path.to_request();
        assert_eq!(request.quality.as_deref(), Some("1080p"));
        assert_eq!(request.index, Some(1));
    }

    #[test]
    fn test_episode_path() {
        let path: PlaybackPath = "vodresolve://series/tmdb:1399/3/9".parse().unwrap();

        assert_eq!(path.kind, ContentKind::Series);
        assert_eq!(path.routing_key, "tmdb:1399");
        assert_eq!(path.episode, Some(EpisodeRef { season: 3, episode: 9 }));
        assert_eq!(path.quality, None);
    }

    #[test]
    fn test_routing_key_with_reserved_characters() {
        let path = PlaybackPath::new("vodresolve", ContentKind::Series, "kitsu/12%34")
            .with_episode(1, 2)
            .with_version(QualityTag::Hd, 0);
        let text = path.to_string();
        assert!(text.starts_with("vodresolve://series/kitsu%2F12%2534/1/2"), "{text}");

        let parsed: PlaybackPath = text.parse().unwrap();
        assert_eq!(parsed, path);
        assert_eq!(parsed.to_request().routing_key, "kitsu/12%34");
    }

    #[test]
    fn test_rejects_unknown_kind() {
        assert!(matches!(
            "vodresolve://album/xyz".parse::<PlaybackPath>(),
            Err(PlaybackPathError::Kind(_))
        ));
        assert!(matches!(
            "vodresolve://movie/tt1?quality=8k".parse::<PlaybackPath>(),
            Err(PlaybackPathError::InvalidField { field: "quality", .. })
        ));
    }

    #[test]
    fn test_playback_key_normalizes_quality() {
        let a = PlaybackRequest::movie("tt0133093").with_quality("1080P").key();
        let b = PlaybackRequest::movie("tt0133093").with_quality(" 1080p ").key();
        let auto = PlaybackRequest::movie("tt0133093").key();

        assert_eq!(a, b);
        assert_ne!(a, auto);
        assert_eq!(auto.to_string(), "movie/tt0133093/auto");
    }
}
