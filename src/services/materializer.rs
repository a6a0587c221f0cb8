//! Versioned item materialization
//!
//! Turns one catalog entry into its primary item plus one virtual sibling
//! per planned quality version, inserting each at most once. The host store
//! has no uniqueness constraint, so the existence check and the insert for
//! one catalog entry always run inside the same per-entry critical section.
//!
//! Series are never versioned: the first task creates the series container
//! and its season/episode tree, every later task is skipped.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::version_planner::VersionPlanner;
use crate::config::Config;
use crate::errors::{AppResult, StoreError, StoreResult};
use crate::models::{
    ArtworkKind, CatalogEntry, CatalogSeason, ContainerId, ContentKind, ItemKind, ItemMarker,
    MaterializedItem, PlaybackPath, RefreshMode, VersionRef, VersionTask, child_scoped_ref,
    version_scoped_ref,
};
use crate::repositories::{LibraryStore, ParentRef};
use crate::utils::{ContentIdentity, IdentityGenerator, KeyedLock, RetryPolicy, with_retry};

/// What happened to one version task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Created,
    AlreadyExisted,
    /// Not applicable (series versions, repeated tasks)
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: VersionTask,
    pub outcome: TaskOutcome,
    /// Identity of the created or existing item
    pub item: Option<ContentIdentity>,
}

/// Counts for the season/episode tree of a series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSummary {
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
}

/// Result of one materialization call
#[derive(Debug, Clone)]
pub struct MaterializeOutcome {
    pub primary: MaterializedItem,
    /// Whether this call created the primary item
    pub created: bool,
    pub tasks: Vec<TaskReport>,
    pub children: TreeSummary,
}

impl MaterializeOutcome {
    fn count(&self, predicate: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.tasks.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn created_count(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Created))
    }

    pub fn existing_count(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::AlreadyExisted))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Failed(_)))
    }
}

/// Inserts catalog entries into the host library
pub struct Materializer {
    store: Arc<dyn LibraryStore>,
    identities: IdentityGenerator,
    planner: VersionPlanner,
    store_timeout: Duration,
    artwork_retry: RetryPolicy,
    locks: KeyedLock<(ContentKind, i64)>,
}

impl Materializer {
    pub fn new(store: Arc<dyn LibraryStore>, config: &Config) -> Self {
        Self {
            store,
            identities: IdentityGenerator::new(config.identity.namespace.clone()),
            planner: VersionPlanner::from_config(&config.versions),
            store_timeout: config.store.timeout,
            artwork_retry: config.artwork_retry.clone(),
            locks: KeyedLock::new(),
        }
    }

    pub fn identities(&self) -> &IdentityGenerator {
        &self.identities
    }

    /// Tasks for one batch: the clean primary, then every planned version
    pub fn batch_tasks(&self) -> Vec<VersionTask> {
        let planned = self.planner.tasks();
        if planned.first().is_some_and(|task| task.quality.is_clean()) {
            return planned;
        }
        std::iter::once(VersionTask::clean()).chain(planned).collect()
    }

    /// Materialize `entry` with the configured versions
    pub async fn materialize(
        &self,
        entry: &CatalogEntry,
        parent: &ContainerId,
    ) -> AppResult<MaterializeOutcome> {
        let tasks = self.batch_tasks();
        self.materialize_tasks(entry, &tasks, parent).await
    }

    /// Materialize `entry` for an explicit task list
    ///
    /// The first task always becomes the clean, non-virtual primary item
    /// whatever its own tag. A failure on the primary is an error; later
    /// failures are reported per task and leave committed items in place.
    pub async fn materialize_tasks(
        &self,
        entry: &CatalogEntry,
        tasks: &[VersionTask],
        parent: &ContainerId,
    ) -> AppResult<MaterializeOutcome> {
        let routing_key = entry.routing_key();
        let first_task = tasks.first().copied().unwrap_or_else(VersionTask::clean);
        info!(
            "Materializing {} '{}' ({}) with {} task(s)",
            entry.kind,
            entry.title,
            routing_key,
            tasks.len().max(1)
        );

        let mut reports = Vec::with_capacity(tasks.len().max(1));
        let mut created_versions = Vec::new();
        let mut children = TreeSummary::default();

        let guard = self.locks.lock((entry.kind, entry.external_id)).await;

        let candidate = self.primary_item(entry, &routing_key);
        let (primary, created) = self
            .ensure(&ParentRef::Container(parent.clone()), candidate)
            .await?;
        reports.push(TaskReport {
            task: first_task,
            outcome: if created {
                TaskOutcome::Created
            } else {
                TaskOutcome::AlreadyExisted
            },
            item: Some(primary.id),
        });

        if entry.kind == ContentKind::Series {
            children = self.ensure_series_tree(entry, &routing_key, &primary).await;
        }

        let mut seen = vec![VersionTask::clean()];
        for task in tasks.iter().skip(1).copied() {
            if entry.kind == ContentKind::Series || task.quality.is_clean() || seen.contains(&task)
            {
                debug!("Skipping task {} for '{}'", task, entry.title);
                reports.push(TaskReport {
                    task,
                    outcome: TaskOutcome::Skipped,
                    item: None,
                });
                continue;
            }
            seen.push(task);

            let candidate = self.version_item(entry, &routing_key, task);
            let report = match self
                .ensure(&ParentRef::Container(parent.clone()), candidate)
                .await
            {
                Ok((item, true)) => {
                    let id = item.id;
                    created_versions.push(item);
                    TaskReport {
                        task,
                        outcome: TaskOutcome::Created,
                        item: Some(id),
                    }
                }
                Ok((item, false)) => TaskReport {
                    task,
                    outcome: TaskOutcome::AlreadyExisted,
                    item: Some(item.id),
                },
                Err(e) => {
                    warn!("Version {} of '{}' failed: {}", task, entry.title, e);
                    TaskReport {
                        task,
                        outcome: TaskOutcome::Failed(e.to_string()),
                        item: None,
                    }
                }
            };
            reports.push(report);
        }

        drop(guard);

        if created {
            self.finish_primary(entry, &primary).await;
        }
        for item in &created_versions {
            if let Err(e) = self.timed("persist", self.store.persist(item)).await {
                warn!("Failed to persist '{}': {}", item.name, e);
            }
        }

        let outcome = MaterializeOutcome {
            primary,
            created,
            tasks: reports,
            children,
        };
        info!(
            "Materialized '{}': {} created, {} existing, {} failed",
            entry.title,
            outcome.created_count(),
            outcome.existing_count(),
            outcome.failed_count()
        );
        Ok(outcome)
    }

    /// Existence check then insert; callers hold the entry lock
    async fn ensure(
        &self,
        parent: &ParentRef,
        candidate: MaterializedItem,
    ) -> StoreResult<(MaterializedItem, bool)> {
        let lookup = candidate.lookup();
        let existing = self
            .timed(
                "find_by_identifiers",
                self.store.find_by_identifiers(&lookup, candidate.kind),
            )
            .await?;
        if let Some(existing) = existing {
            debug!("{} '{}' already exists as {}", existing.kind, existing.name, existing.id);
            return Ok((existing, false));
        }

        self.timed("insert_child", self.store.insert_child(parent, &candidate))
            .await?;
        debug!("Created {} '{}' as {}", candidate.kind, candidate.name, candidate.id);
        Ok((candidate, true))
    }

    async fn ensure_series_tree(
        &self,
        entry: &CatalogEntry,
        routing_key: &str,
        series: &MaterializedItem,
    ) -> TreeSummary {
        let mut summary = TreeSummary::default();

        for season in &entry.seasons {
            let candidate = self.season_item(entry, series, season);
            let season_item = match self.ensure(&ParentRef::Item(series.id), candidate).await {
                Ok((item, created)) => {
                    summary.record(created);
                    item
                }
                Err(e) => {
                    warn!(
                        "Season {} of '{}' failed, skipping its episodes: {}",
                        season.number, entry.title, e
                    );
                    summary.failed += 1 + season.episodes.len();
                    continue;
                }
            };

            for episode in &season.episodes {
                let mut candidate = self.base_item(
                    entry,
                    self.identities
                        .child(&season_item.id, &format!("e{}", episode.number)),
                    ItemKind::Episode,
                    episode.title.clone(),
                );
                candidate.scoped_ref = Some(child_scoped_ref(
                    entry.kind,
                    entry.external_id,
                    season.number,
                    Some(episode.number),
                ));
                candidate.playback_path = Some(
                    PlaybackPath::new(self.identities.namespace(), ContentKind::Series, routing_key)
                        .with_episode(season.number, episode.number),
                );
                candidate.parent = Some(season_item.id);
                candidate.season_number = Some(season.number);
                candidate.episode_number = Some(episode.number);
                candidate.overview = episode.overview.clone();
                candidate.release_date = episode.air_date;

                match self
                    .ensure(&ParentRef::Item(season_item.id), candidate)
                    .await
                {
                    Ok((_, created)) => summary.record(created),
                    Err(e) => {
                        warn!(
                            "Episode S{}E{} of '{}' failed: {}",
                            season.number, episode.number, entry.title, e
                        );
                        summary.failed += 1;
                    }
                }
            }
        }

        if !entry.seasons.is_empty() {
            debug!(
                "Series tree for '{}': {} created, {} existing, {} failed",
                entry.title, summary.created, summary.existing, summary.failed
            );
        }
        summary
    }

    /// Artwork, persist and refresh for a newly created primary item
    async fn finish_primary(&self, entry: &CatalogEntry, primary: &MaterializedItem) {
        if let Some(backdrop) = entry.backdrop.as_deref() {
            let saved = with_retry(
                &self.artwork_retry,
                || {
                    self.timed(
                        "save_artwork",
                        self.store.save_artwork(primary, ArtworkKind::Backdrop, backdrop),
                    )
                },
                "save_artwork",
            )
            .await;
            if let Err(e) = saved {
                warn!("Failed to save backdrop for '{}': {}", primary.name, e);
            }
        }

        if let Err(e) = self.timed("persist", self.store.persist(primary)).await {
            warn!("Failed to persist '{}': {}", primary.name, e);
        }
        if let Err(e) = self
            .timed(
                "request_refresh",
                self.store.request_refresh(primary, RefreshMode::Full),
            )
            .await
        {
            warn!("Failed to request refresh for '{}': {}", primary.name, e);
        }
    }

    async fn timed<T>(
        &self,
        operation: &str,
        call: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout {
                operation: operation.to_string(),
            })?
    }

    fn base_item(
        &self,
        entry: &CatalogEntry,
        id: ContentIdentity,
        kind: ItemKind,
        name: String,
    ) -> MaterializedItem {
        MaterializedItem {
            id,
            kind,
            name,
            catalog_id: entry.external_id,
            cross_ref: entry.cross_ref.clone(),
            scoped_ref: None,
            playback_path: None,
            is_virtual: false,
            marker: ItemMarker {
                namespace: self.identities.namespace().to_string(),
                version: None,
            },
            parent: None,
            season_number: None,
            episode_number: None,
            overview: entry.overview.clone(),
            release_date: entry.release_date,
            rating: entry.rating,
            genres: entry.genres.clone(),
            poster: entry.poster.clone(),
        }
    }

    fn primary_item(&self, entry: &CatalogEntry, routing_key: &str) -> MaterializedItem {
        let mut item = self.base_item(
            entry,
            self.identities.primary(entry.kind, entry.external_id),
            entry.kind.into(),
            entry.title.clone(),
        );
        if entry.kind == ContentKind::Movie {
            item.playback_path = Some(PlaybackPath::new(
                self.identities.namespace(),
                entry.kind,
                routing_key,
            ));
        }
        item
    }

    fn version_item(
        &self,
        entry: &CatalogEntry,
        routing_key: &str,
        task: VersionTask,
    ) -> MaterializedItem {
        let mut item = self.base_item(
            entry,
            self.identities.identity(
                entry.kind,
                entry.external_id,
                task.quality,
                Some(task.index),
            ),
            entry.kind.into(),
            format!("{}{}", entry.title, task.display_suffix()),
        );
        item.scoped_ref = Some(version_scoped_ref(
            entry.kind,
            entry.external_id,
            task.quality,
            task.index,
        ));
        item.playback_path = Some(
            PlaybackPath::new(self.identities.namespace(), entry.kind, routing_key)
                .with_version(task.quality, task.index),
        );
        item.is_virtual = true;
        item.marker.version = Some(VersionRef {
            quality: task.quality,
            index: task.index,
        });
        item
    }

    fn season_item(
        &self,
        entry: &CatalogEntry,
        series: &MaterializedItem,
        season: &CatalogSeason,
    ) -> MaterializedItem {
        let name = season
            .name
            .clone()
            .unwrap_or_else(|| format!("Season {}", season.number));
        let mut item = self.base_item(
            entry,
            self.identities
                .child(&series.id, &format!("s{}", season.number)),
            ItemKind::Season,
            name,
        );
        item.scoped_ref = Some(child_scoped_ref(
            entry.kind,
            entry.external_id,
            season.number,
            None,
        ));
        item.parent = Some(series.id);
        item.season_number = Some(season.number);
        item
    }
}

impl TreeSummary {
    fn record(&mut self, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.existing += 1;
        }
    }
}
