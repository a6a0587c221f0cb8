//! Host library store abstraction
//!
//! The host store owns durable item storage and the parent/child hierarchy.
//! It has no uniqueness constraint of its own; callers that need "at most
//! one item per identity" must serialize their existence checks and inserts.

use async_trait::async_trait;

use crate::errors::StoreResult;
use crate::models::{
    ArtworkKind, ContainerId, ItemKind, ItemLookup, MaterializedItem, RefreshMode,
};
use crate::utils::identity::ContentIdentity;

/// Where a new item is attached
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentRef {
    /// A host library folder
    Container(ContainerId),
    /// Another materialized item (series -> season -> episode)
    Item(ContentIdentity),
}

impl std::fmt::Display for ParentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container(id) => write!(f, "container:{id}"),
            Self::Item(id) => write!(f, "item:{id}"),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Find an existing item of `kind` matching the lookup
    async fn find_by_identifiers(
        &self,
        lookup: &ItemLookup,
        kind: ItemKind,
    ) -> StoreResult<Option<MaterializedItem>>;

    /// Attach a new item below `parent`
    async fn insert_child(&self, parent: &ParentRef, item: &MaterializedItem) -> StoreResult<()>;

    /// Write the item's current state back to durable storage
    async fn persist(&self, item: &MaterializedItem) -> StoreResult<()>;

    /// Ask the host to refresh the item so it becomes visible
    async fn request_refresh(&self, item: &MaterializedItem, mode: RefreshMode) -> StoreResult<()>;

    /// Fetch `url` and store it as the item's artwork of `kind`
    async fn save_artwork(
        &self,
        item: &MaterializedItem,
        kind: ArtworkKind,
        url: &str,
    ) -> StoreResult<()>;
}
