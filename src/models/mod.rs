//! Domain models shared by the materialization and resolution services

pub mod catalog;
pub mod item;
pub mod playback;
pub mod quality;
pub mod version;

pub use catalog::{CatalogEntry, CatalogEpisode, CatalogSeason, ContentKind};
pub use item::{
    ArtworkKind, ContainerId, ItemKind, ItemLookup, ItemMarker, MaterializedItem, RefreshMode,
    VersionRef, child_scoped_ref, version_scoped_ref,
};
pub use playback::{
    EpisodeRef, PlaybackKey, PlaybackPath, PlaybackPathError, PlaybackRequest, StreamCandidate,
};
pub use quality::{FallbackPreference, QualityTag, ResolutionTier};
pub use version::VersionTask;
