//! Items materialized into the host library

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::catalog::ContentKind;
use super::playback::PlaybackPath;
use super::quality::QualityTag;
use crate::utils::identity::ContentIdentity;

/// Kind of item stored in the host library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemKind {
    Movie,
    Series,
    Season,
    Episode,
}

impl From<ContentKind> for ItemKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Movie => Self::Movie,
            ContentKind::Series => Self::Series,
        }
    }
}

/// Host container an item is inserted under (a library folder)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marks an item as created by this crate
///
/// The host store may hold items from many sources; only items carrying a
/// marker are ever looked up or touched here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemMarker {
    pub namespace: String,
    /// Version this item represents; `None` for primary and child items
    pub version: Option<VersionRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRef {
    pub quality: QualityTag,
    pub index: u32,
}

/// Durable record inserted into the host store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedItem {
    pub id: ContentIdentity,
    pub kind: ItemKind,
    pub name: String,
    pub catalog_id: i64,
    /// Cross-reference id shared by every version of one catalog entry
    pub cross_ref: Option<String>,
    /// Exact reference for versions and children; `None` on the primary
    pub scoped_ref: Option<String>,
    /// Where playback resolution starts; containers have none
    pub playback_path: Option<PlaybackPath>,
    pub is_virtual: bool,
    pub marker: ItemMarker,
    /// Parent item for seasons and episodes
    pub parent: Option<ContentIdentity>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub overview: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub rating: Option<f32>,
    pub genres: Vec<String>,
    pub poster: Option<String>,
}

impl MaterializedItem {
    /// Primary items are the single non-virtual top-level item of an entry
    pub fn is_primary(&self) -> bool {
        !self.is_virtual && matches!(self.kind, ItemKind::Movie | ItemKind::Series)
    }

    /// Lookup that identifies this item in the host store
    pub fn lookup(&self) -> ItemLookup {
        match &self.scoped_ref {
            Some(scoped_ref) => ItemLookup::Scoped {
                scoped_ref: scoped_ref.clone(),
            },
            None => ItemLookup::Broad {
                catalog_id: self.catalog_id,
                cross_ref: self.cross_ref.clone(),
            },
        }
    }
}

/// How to look for an existing item
///
/// Versions intentionally share the catalog id, so they must be found by
/// exact scoped reference; matching them by catalog id would collapse every
/// quality version into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemLookup {
    /// Exact match on a version or child reference
    Scoped { scoped_ref: String },
    /// Any shared external identifier (primary items)
    Broad {
        catalog_id: i64,
        cross_ref: Option<String>,
    },
}

/// Scoped reference for a quality version
///
/// Keyed on the catalog id, which never changes for an entry. The routing
/// key does change once a cross-reference id becomes known.
pub fn version_scoped_ref(
    kind: ContentKind,
    catalog_id: i64,
    quality: QualityTag,
    index: u32,
) -> String {
    format!("{kind}:{catalog_id}:{quality}:{index}")
}

/// Scoped reference for a season or episode
pub fn child_scoped_ref(
    kind: ContentKind,
    catalog_id: i64,
    season: u32,
    episode: Option<u32>,
) -> String {
    match episode {
        Some(episode) => format!("{kind}:{catalog_id}:s{season}e{episode}"),
        None => format!("{kind}:{catalog_id}:s{season}"),
    }
}

/// Artwork slots the host can persist for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ArtworkKind {
    Poster,
    Backdrop,
}

/// How much the host should refresh after persisting an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RefreshMode {
    /// Re-read the stored record only
    Default,
    /// Full metadata and image refresh
    Full,
}
