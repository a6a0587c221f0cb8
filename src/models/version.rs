use serde::{Deserialize, Serialize};

use super::quality::QualityTag;

/// One version of a catalog entry to materialize
///
/// Computed fresh for every materialization call, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionTask {
    pub quality: QualityTag,
    pub index: u32,
}

impl VersionTask {
    pub fn new(quality: QualityTag, index: u32) -> Self {
        Self { quality, index }
    }

    /// The degenerate "one clean item, no versioning" task
    pub fn clean() -> Self {
        Self::new(QualityTag::Clean, 0)
    }

    /// Suffix appended to the catalog title, e.g. ` [1080p #2]`
    pub fn display_suffix(&self) -> String {
        if self.quality.is_clean() {
            String::new()
        } else if self.index == 0 {
            format!(" [{}]", self.quality.display_label())
        } else {
            format!(" [{} #{}]", self.quality.display_label(), self.index + 1)
        }
    }
}

impl std::fmt::Display for VersionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.quality.is_clean() {
            write!(f, "clean#{}", self.index)
        } else {
            write!(f, "{}#{}", self.quality, self.index)
        }
    }
}
