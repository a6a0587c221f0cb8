//! Stream selection
//!
//! Picks one upstream candidate for a requested quality and index. A
//! requested quality filters candidates by indicator substrings in their
//! description. When nothing matches (or no quality was requested) the
//! selector falls back to discovery: the preferred tier if one is
//! configured, then the best tier present, then the first candidate.

use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::models::{FallbackPreference, ResolutionTier, StreamCandidate};

/// Quality filter understood by the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedQuality {
    Tier(ResolutionTier),
    /// Candidates that match no known tier
    Untagged,
}

impl RequestedQuality {
    /// `None` for absent, "auto" or unrecognised labels
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
            return None;
        }
        if raw.eq_ignore_ascii_case("unknown") {
            return Some(Self::Untagged);
        }
        match raw.parse::<ResolutionTier>() {
            Ok(tier) => Some(Self::Tier(tier)),
            Err(_) => {
                debug!("Ignoring unrecognised quality '{}'", raw);
                None
            }
        }
    }

    fn matches(&self, description: &str) -> bool {
        match self {
            Self::Tier(tier) => tier.matches_lowercase(description),
            Self::Untagged => tier_of(description).is_none(),
        }
    }
}

/// How a ranked pool was built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Candidates matching the requested quality, upstream order
    QualityMatch,
    /// Preferred tier, then best tier first, then untagged
    Discovery,
}

/// Candidates in the order they should be tried
#[derive(Debug, Clone)]
pub struct RankedPool<'a> {
    pub mode: SelectionMode,
    pub candidates: Vec<&'a StreamCandidate>,
}

impl<'a> RankedPool<'a> {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidate at `index`, clamped to the last position
    pub fn get_clamped(&self, index: usize) -> Option<&'a StreamCandidate> {
        let last = self.candidates.len().checked_sub(1)?;
        self.candidates.get(index.min(last)).copied()
    }
}

/// Best tier named in a description, if any
fn tier_of(description: &str) -> Option<ResolutionTier> {
    let lower = description.to_lowercase();
    ResolutionTier::PRIORITY
        .into_iter()
        .find(|tier| tier.matches_lowercase(&lower))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionSelector {
    fallback: FallbackPreference,
}

impl ResolutionSelector {
    pub fn new(fallback: FallbackPreference) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> FallbackPreference {
        self.fallback
    }

    /// Pick one candidate
    ///
    /// With a matching quality the requested index (default 0) is clamped
    /// into the filtered set. In discovery the index is not used.
    pub fn select<'a>(
        &self,
        candidates: &'a [StreamCandidate],
        requested_quality: Option<&str>,
        requested_index: Option<usize>,
    ) -> AppResult<&'a StreamCandidate> {
        let pool = self.rank(candidates, requested_quality);
        let index = match pool.mode {
            SelectionMode::QualityMatch => requested_index.unwrap_or(0),
            SelectionMode::Discovery => 0,
        };
        pool.get_clamped(index)
            .ok_or_else(|| AppError::not_found("stream", "no candidates"))
    }

    /// Order candidates for selection and failover
    pub fn rank<'a>(
        &self,
        candidates: &'a [StreamCandidate],
        requested_quality: Option<&str>,
    ) -> RankedPool<'a> {
        if let Some(quality) = RequestedQuality::parse(requested_quality) {
            let matched: Vec<&StreamCandidate> = candidates
                .iter()
                .filter(|c| quality.matches(&c.description.to_lowercase()))
                .collect();
            if !matched.is_empty() {
                return RankedPool {
                    mode: SelectionMode::QualityMatch,
                    candidates: matched,
                };
            }
            debug!(
                "No candidate matches {:?} among {}, falling back to discovery",
                quality,
                candidates.len()
            );
        }

        RankedPool {
            mode: SelectionMode::Discovery,
            candidates: self.discovery_order(candidates),
        }
    }

    fn discovery_order<'a>(&self, candidates: &'a [StreamCandidate]) -> Vec<&'a StreamCandidate> {
        let lowered: Vec<String> = candidates
            .iter()
            .map(|c| c.description.to_lowercase())
            .collect();
        let mut taken = vec![false; candidates.len()];
        let mut ordered = Vec::with_capacity(candidates.len());

        let preferred = match self.fallback {
            FallbackPreference::Tier(tier) => Some(tier),
            FallbackPreference::Auto => None,
        };
        let tiers = preferred.into_iter().chain(ResolutionTier::PRIORITY);

        for tier in tiers {
            for (position, text) in lowered.iter().enumerate() {
                if !taken[position] && tier.matches_lowercase(text) {
                    taken[position] = true;
                    ordered.push(&candidates[position]);
                }
            }
        }

        ordered.extend(
            candidates
                .iter()
                .zip(taken)
                .filter(|(_, taken)| !taken)
                .map(|(candidate, _)| candidate),
        );
        ordered
    }
}
