use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rstest::rstest;

use vod_resolve::config::{Config, VersionsConfig};
use vod_resolve::models::{CatalogEntry, ContainerId, ContentKind, QualityTag};
use vod_resolve::repositories::InMemoryLibraryStore;
use vod_resolve::services::{Materializer, TaskOutcome};
use vod_resolve::utils::RetryPolicy;

fn library() -> ContainerId {
    ContainerId::new("movies")
}

fn materializer(store: &InMemoryLibraryStore) -> Arc<Materializer> {
    let config = Config {
        versions: VersionsConfig {
            enabled_tiers: vec![QualityTag::FullHd, QualityTag::Hd],
            max_per_tier: 2,
        },
        artwork_retry: RetryPolicy::none(),
        ..Config::default()
    };
    Arc::new(Materializer::new(Arc::new(store.clone()), &config))
}

fn matrix() -> CatalogEntry {
    CatalogEntry::new(ContentKind::Movie, 603, "The Matrix").with_cross_ref("tt0133093")
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(50)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_create_each_version_once(#[case] callers: usize) {
    // Latency widens the window between existence check and insert
    let store =
        InMemoryLibraryStore::with_container(library()).with_latency(Duration::from_millis(2));
    let materializer = materializer(&store);

    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let materializer = Arc::clone(&materializer);
            tokio::spawn(async move { materializer.materialize(&matrix(), &library()).await })
        })
        .collect();

    let outcomes: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("materialize failed"))
        .collect();

    let items = store.items().await;
    assert_eq!(items.len(), 5, "one primary plus 2 tiers x 2 versions");

    let unique: HashSet<_> = items.iter().map(|item| item.id).collect();
    assert_eq!(unique.len(), items.len(), "no identity inserted twice");

    let scoped: HashSet<_> = items.iter().filter_map(|item| item.scoped_ref.clone()).collect();
    assert_eq!(scoped.len(), 4);

    assert_eq!(outcomes.iter().filter(|o| o.created).count(), 1);
    let created_tasks: usize = outcomes.iter().map(|o| o.created_count()).sum();
    assert_eq!(created_tasks, 5);

    let primary = outcomes[0].primary.id;
    assert!(outcomes.iter().all(|o| o.primary.id == primary));
    assert!(
        outcomes
            .iter()
            .flat_map(|o| &o.tasks)
            .all(|r| !matches!(r.outcome, TaskOutcome::Failed(_)))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_entries_materialize_in_parallel() {
    let store =
        InMemoryLibraryStore::with_container(library()).with_latency(Duration::from_millis(2));
    let materializer = materializer(&store);

    let entries: Vec<CatalogEntry> = (0..10)
        .map(|n| CatalogEntry::new(ContentKind::Movie, 1000 + n, format!("Movie {n}")))
        .collect();

    let handles: Vec<_> = entries
        .iter()
        .cloned()
        .chain(entries.iter().cloned())
        .map(|entry| {
            let materializer = Arc::clone(&materializer);
            tokio::spawn(async move { materializer.materialize(&entry, &library()).await })
        })
        .collect();

    for joined in join_all(handles).await {
        joined.expect("task panicked").expect("materialize failed");
    }

    let items = store.items().await;
    assert_eq!(items.len(), 10 * 5);
    assert_eq!(items.iter().filter(|item| !item.is_virtual).count(), 10);
}
