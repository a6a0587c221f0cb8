//! In-memory library store
//!
//! Reference implementation of [`LibraryStore`] used by the CLI and tests.
//! Like a real host store it does not reject duplicates, so a caller that
//! races its existence checks will leave duplicate records behind.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::{LibraryStore, ParentRef};
use crate::errors::{StoreError, StoreResult};
use crate::models::{
    ArtworkKind, ContainerId, ItemKind, ItemLookup, MaterializedItem, RefreshMode,
};
use crate::utils::identity::ContentIdentity;

#[derive(Debug, Clone)]
pub struct StoredItem {
    pub item: MaterializedItem,
    pub parent: ParentRef,
}

#[derive(Debug, Default)]
struct StoreState {
    containers: HashSet<ContainerId>,
    items: Vec<StoredItem>,
    persisted: Vec<ContentIdentity>,
    refreshes: Vec<(ContentIdentity, RefreshMode)>,
    artwork: Vec<(ContentIdentity, ArtworkKind, String)>,
}

#[derive(Clone, Default)]
pub struct InMemoryLibraryStore {
    state: Arc<RwLock<StoreState>>,
    /// Artificial delay applied to lookups and inserts
    latency: Option<Duration>,
}

impl InMemoryLibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with one registered library folder
    pub fn with_container(container: ContainerId) -> Self {
        let mut state = StoreState::default();
        state.containers.insert(container);
        Self {
            state: Arc::new(RwLock::new(state)),
            latency: None,
        }
    }

    /// Delay every lookup and insert, widening race windows in tests
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn add_container(&self, container: ContainerId) {
        self.state.write().await.containers.insert(container);
    }

    pub async fn items(&self) -> Vec<MaterializedItem> {
        self.state
            .read()
            .await
            .items
            .iter()
            .map(|stored| stored.item.clone())
            .collect()
    }

    pub async fn children_of(&self, parent: &ParentRef) -> Vec<MaterializedItem> {
        self.state
            .read()
            .await
            .items
            .iter()
            .filter(|stored| &stored.parent == parent)
            .map(|stored| stored.item.clone())
            .collect()
    }

    pub async fn refresh_requests(&self) -> Vec<(ContentIdentity, RefreshMode)> {
        self.state.read().await.refreshes.clone()
    }

    pub async fn persisted(&self) -> Vec<ContentIdentity> {
        self.state.read().await.persisted.clone()
    }

    pub async fn artwork(&self) -> Vec<(ContentIdentity, ArtworkKind, String)> {
        self.state.read().await.artwork.clone()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn matches_lookup(item: &MaterializedItem, lookup: &ItemLookup) -> bool {
    match lookup {
        ItemLookup::Scoped { scoped_ref } => item.scoped_ref.as_deref() == Some(scoped_ref),
        // Scoped items are only reachable by their exact reference
        ItemLookup::Broad {
            catalog_id,
            cross_ref,
        } => {
            item.scoped_ref.is_none()
                && (item.catalog_id == *catalog_id
                    || (cross_ref.is_some() && item.cross_ref == *cross_ref))
        }
    }
}

#[async_trait]
impl LibraryStore for InMemoryLibraryStore {
    async fn find_by_identifiers(
        &self,
        lookup: &ItemLookup,
        kind: ItemKind,
    ) -> StoreResult<Option<MaterializedItem>> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        Ok(state
            .items
            .iter()
            .find(|stored| stored.item.kind == kind && matches_lookup(&stored.item, lookup))
            .map(|stored| stored.item.clone()))
    }

    async fn insert_child(&self, parent: &ParentRef, item: &MaterializedItem) -> StoreResult<()> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;

        let parent_exists = match parent {
            ParentRef::Container(container) => state.containers.contains(container),
            ParentRef::Item(id) => state.items.iter().any(|stored| stored.item.id == *id),
        };
        if !parent_exists {
            return Err(StoreError::ContainerNotFound {
                container: parent.to_string(),
            });
        }

        debug!("Inserted {} '{}' under {}", item.kind, item.name, parent);
        state.items.push(StoredItem {
            item: item.clone(),
            parent: parent.clone(),
        });
        Ok(())
    }

    async fn persist(&self, item: &MaterializedItem) -> StoreResult<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        match state.items.iter_mut().find(|stored| stored.item.id == item.id) {
            Some(stored) => {
                stored.item = item.clone();
                state.persisted.push(item.id);
                Ok(())
            }
            None => Err(StoreError::rejected("persist", format!("unknown item {}", item.id))),
        }
    }

    async fn request_refresh(&self, item: &MaterializedItem, mode: RefreshMode) -> StoreResult<()> {
        self.state.write().await.refreshes.push((item.id, mode));
        Ok(())
    }

    async fn save_artwork(
        &self,
        item: &MaterializedItem,
        kind: ArtworkKind,
        url: &str,
    ) -> StoreResult<()> {
        self.state
            .write()
            .await
            .artwork
            .push((item.id, kind, url.to_string()));
        Ok(())
    }
}
