//! Materialization and playback resolution services

pub mod failover;
pub mod materializer;
pub mod metadata_cache;
pub mod resolver;
pub mod search_bridge;
pub mod selector;
pub mod version_planner;

pub use failover::{FailoverManager, FailoverState, FailoverWindows, Serving, Transition};
pub use materializer::{MaterializeOutcome, Materializer, TaskOutcome, TaskReport, TreeSummary};
pub use metadata_cache::{CachedEntry, MetadataCache};
pub use resolver::{PlaybackResolver, Resolution};
pub use search_bridge::{SearchBridge, SearchHit};
pub use selector::{RankedPool, RequestedQuality, ResolutionSelector, SelectionMode};
pub use version_planner::{VersionPlanner, plan};
