//! Quality tags for item versions and resolution tiers for stream matching
//!
//! Matching a tier against free-text stream descriptions is a best-effort
//! heuristic: upstream sources name qualities inconsistently ("2160p",
//! "4K HDR", "UHD") and the indicator tables below are not exhaustive.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Quality label attached to a materialized version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum QualityTag {
    /// No explicit quality, clean title
    #[default]
    #[strum(to_string = "")]
    Clean,
    #[strum(to_string = "4K", serialize = "2160p", serialize = "uhd")]
    Uhd4k,
    #[strum(to_string = "1080p", serialize = "1080", serialize = "fhd")]
    FullHd,
    #[strum(to_string = "720p", serialize = "720", serialize = "hd")]
    Hd,
    #[strum(to_string = "Unknown", serialize = "sd")]
    Unknown,
}

impl QualityTag {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    /// Human label used in display names
    pub fn display_label(&self) -> &'static str {
        match self {
            Self::Clean => "",
            Self::Uhd4k => "4K",
            Self::FullHd => "1080p",
            Self::Hd => "720p",
            Self::Unknown => "SD",
        }
    }

    /// Resolution tier used to filter upstream candidates, if any
    pub fn tier(&self) -> Option<ResolutionTier> {
        match self {
            Self::Uhd4k => Some(ResolutionTier::Uhd),
            Self::FullHd => Some(ResolutionTier::FullHd),
            Self::Hd => Some(ResolutionTier::Hd),
            Self::Clean | Self::Unknown => None,
        }
    }
}

impl TryFrom<String> for QualityTag {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse()
    }
}

impl From<QualityTag> for String {
    fn from(tag: QualityTag) -> Self {
        tag.to_string()
    }
}

impl Serialize for QualityTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for QualityTag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        QualityTag::try_from(raw.clone())
            .map_err(|_| serde::de::Error::custom(format!("unknown quality tag '{raw}'")))
    }
}

/// Coarse resolution tier recognised in upstream stream descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ResolutionTier {
    #[strum(to_string = "4K", serialize = "2160p", serialize = "uhd")]
    Uhd,
    #[strum(to_string = "1440p", serialize = "1440", serialize = "2k")]
    Qhd,
    #[strum(to_string = "1080p", serialize = "1080", serialize = "fhd")]
    FullHd,
    #[strum(to_string = "720p", serialize = "720", serialize = "hd")]
    Hd,
    #[strum(to_string = "480p", serialize = "480", serialize = "sd")]
    Sd,
}

impl ResolutionTier {
    /// Discovery order, best first
    pub const PRIORITY: [ResolutionTier; 5] = [
        ResolutionTier::Uhd,
        ResolutionTier::Qhd,
        ResolutionTier::FullHd,
        ResolutionTier::Hd,
        ResolutionTier::Sd,
    ];

    /// Lowercase substrings that mark a description as this tier
    pub fn indicators(&self) -> &'static [&'static str] {
        match self {
            Self::Uhd => &["4k", "2160p", "2160"],
            Self::Qhd => &["1440p", "1440"],
            Self::FullHd => &["1080p", "1080"],
            Self::Hd => &["720p", "720"],
            Self::Sd => &["480p", "480"],
        }
    }

    /// `text` must already be lowercased
    pub fn matches_lowercase(&self, text: &str) -> bool {
        self.indicators().iter().any(|needle| text.contains(needle))
    }
}

/// Which tier to prefer when the requested quality is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPreference {
    #[default]
    Auto,
    Tier(ResolutionTier),
}

impl std::fmt::Display for FallbackPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => f.write_str("Auto"),
            Self::Tier(tier) => write!(f, "{tier}"),
        }
    }
}

impl std::str::FromStr for FallbackPreference {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse().map(Self::Tier)
    }
}

impl Serialize for FallbackPreference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FallbackPreference {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|_| serde::de::Error::custom(format!("unknown fallback preference '{raw}'")))
    }
}
