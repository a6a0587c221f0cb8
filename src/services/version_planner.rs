//! Version planning
//!
//! Expands the enabled quality tiers into the ordered list of versions to
//! materialize for one catalog entry. The planner only orders tasks; the
//! materializer decides that the first task becomes the primary item.

use crate::config::defaults::{MAX_MAX_PER_TIER, MIN_MAX_PER_TIER};
use crate::config::VersionsConfig;
use crate::models::{QualityTag, VersionTask};

/// Plans version tasks from configured tiers
#[derive(Debug, Clone)]
pub struct VersionPlanner {
    tiers: Vec<QualityTag>,
    max_per_tier: u32,
}

impl VersionPlanner {
    pub fn new(tiers: Vec<QualityTag>, max_per_tier: u32) -> Self {
        Self {
            tiers,
            max_per_tier,
        }
    }

    pub fn from_config(config: &VersionsConfig) -> Self {
        Self::new(config.enabled_tiers.clone(), config.effective_max_per_tier())
    }

    pub fn tasks(&self) -> Vec<VersionTask> {
        plan(&self.tiers, self.max_per_tier)
    }
}

/// Ordered version tasks for `tiers` x `max_per_tier`
///
/// An empty tier list degrades to a single clean task. `max_per_tier` is
/// clamped to `[1, 10]`; repeated and clean tiers are ignored.
pub fn plan(tiers: &[QualityTag], max_per_tier: u32) -> Vec<VersionTask> {
    let per_tier = max_per_tier.clamp(MIN_MAX_PER_TIER, MAX_MAX_PER_TIER);

    let mut seen: Vec<QualityTag> = Vec::with_capacity(tiers.len());
    for tier in tiers {
        if !tier.is_clean() && !seen.contains(tier) {
            seen.push(*tier);
        }
    }

    if seen.is_empty() {
        return vec![VersionTask::clean()];
    }

    seen.into_iter()
        .flat_map(|tier| (0..per_tier).map(move |index| VersionTask::new(tier, index)))
        .collect()
}
