use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;

use vod_resolve::config::Config;
use vod_resolve::errors::SourceResult;
use vod_resolve::models::{ContentKind, PlaybackRequest, StreamCandidate};
use vod_resolve::services::{FailoverManager, FailoverState, PlaybackResolver};
use vod_resolve::sources::StreamSource;

struct FixedStreams(Vec<StreamCandidate>);

#[async_trait]
impl StreamSource for FixedStreams {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn list_streams(
        &self,
        _kind: ContentKind,
        _routing_key: &str,
        _season: Option<u32>,
        _episode: Option<u32>,
    ) -> SourceResult<Vec<StreamCandidate>> {
        Ok(self.0.clone())
    }
}

fn resolver(config: &Config) -> PlaybackResolver {
    let streams = vec![
        StreamCandidate::new("Show S01E01 1080p WEB", "https://cdn/a"),
        StreamCandidate::new("Show S01E01 1080p HDTV", "https://cdn/b"),
        StreamCandidate::new("Show S01E01 1080p x265", "https://cdn/c"),
    ];
    PlaybackResolver::new(
        Arc::new(FixedStreams(streams)),
        Arc::new(FailoverManager::new(config.failover.clone())),
        config,
    )
}

fn episode() -> PlaybackRequest {
    PlaybackRequest::episode("tt0944947", 1, 1).with_quality("1080p")
}

fn secs(base: Instant, secs: u64) -> Instant {
    base + Duration::from_secs(secs)
}

#[tokio::test]
async fn test_buffering_player_keeps_same_stream() {
    let resolver = resolver(&Config::default());
    let t0 = Instant::now();

    let first = resolver.resolve_at(&episode(), t0).await.unwrap();
    let second = resolver.resolve_at(&episode(), secs(t0, 10)).await.unwrap();

    assert_eq!(first.url, "https://cdn/a");
    assert_eq!(second.url, first.url);
}

#[tokio::test]
async fn test_dead_link_advances_then_wraps() {
    let resolver = resolver(&Config::default());
    let t0 = Instant::now();

    let mut urls = Vec::new();
    for step in 0..5 {
        let resolution = resolver
            .resolve_at(&episode(), secs(t0, step * 50))
            .await
            .unwrap();
        urls.push(resolution.url);
    }

    assert_eq!(
        urls,
        vec![
            "https://cdn/a",
            "https://cdn/b",
            "https://cdn/c",
            "https://cdn/a",
            "https://cdn/b"
        ]
    );
}

#[tokio::test]
async fn test_success_assumed_after_reset_window() {
    let resolver = resolver(&Config::default());
    let t0 = Instant::now();
    let request = episode().with_index(1);

    assert_eq!(resolver.resolve_at(&request, t0).await.unwrap().index, 1);
    assert_eq!(resolver.resolve_at(&request, secs(t0, 50)).await.unwrap().index, 2);
    assert_eq!(resolver.resolve_at(&request, secs(t0, 50 + 125)).await.unwrap().index, 1);
}

#[tokio::test]
async fn test_failover_disabled_for_series_passes_through() {
    let mut config = Config::default();
    config.failover.series_enabled = false;
    let resolver = resolver(&config);
    let t0 = Instant::now();

    for step in 0..3 {
        let resolution = resolver
            .resolve_at(&episode(), secs(t0, step * 50))
            .await
            .unwrap();
        assert_eq!(resolution.url, "https://cdn/a");
    }
    assert!(resolver.failover().is_empty());
}

#[tokio::test]
async fn test_episodes_track_failover_separately() {
    let resolver = resolver(&Config::default());
    let t0 = Instant::now();
    let other = PlaybackRequest::episode("tt0944947", 1, 2).with_quality("1080p");

    resolver.resolve_at(&episode(), t0).await.unwrap();
    resolver.resolve_at(&other, t0).await.unwrap();
    let advanced = resolver.resolve_at(&episode(), secs(t0, 50)).await.unwrap();
    let held = resolver.resolve_at(&other, secs(t0, 20)).await.unwrap();

    assert_eq!(advanced.url, "https://cdn/b");
    assert_eq!(held.url, "https://cdn/a");
    assert_eq!(resolver.failover().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_repeats_advance_only_once() {
    let manager = Arc::new(FailoverManager::new(Config::default().failover));
    let key = episode().key();
    let t0 = Instant::now();
    manager.next_index(&key, None, 3, t0);

    let retry_at = secs(t0, 50);
    let handles: Vec<_> = (0..50)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let key = key.clone();
            tokio::spawn(async move { manager.next_index(&key, None, 3, retry_at) })
        })
        .collect();

    let indices: Vec<usize> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert!(indices.iter().all(|&index| index == 1), "got {indices:?}");
    match manager.state(&key) {
        FailoverState::Serving(serving) => {
            assert_eq!(serving.index, 1);
            assert_eq!(serving.attempt_count, 51);
        }
        FailoverState::Fresh => panic!("state missing"),
    }
}
