//! Deterministic content identities
//!
//! Identities are derived from a canonical string, not from the hash
//! algorithm's view of the inputs, so they stay stable across restarts and
//! could be reproduced by any other implementation that follows the same
//! canonical format:
//!
//! ```text
//! {namespace}://{kind}/{external_id}[/{quality}][/{index}]
//! ```
//!
//! The quality segment is present when the tag is non-empty; the index
//! segment is present when there is a quality segment or the index is
//! non-zero. The primary item (`""`, `0`) therefore has the bare
//! `{namespace}://{kind}/{external_id}` form.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{ContentKind, QualityTag};

/// Fixed-width opaque identity of a materialized item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentIdentity(Uuid);

impl ContentIdentity {
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Identity of an arbitrary canonical string
    pub fn from_canonical(canonical: &str) -> Self {
        let digest = Sha256::digest(canonical.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

impl std::fmt::Display for ContentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl From<Uuid> for ContentIdentity {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Build the canonical string for a content identity
pub fn canonical_string(
    namespace: &str,
    kind: ContentKind,
    external_id: i64,
    quality: QualityTag,
    index: u32,
) -> String {
    let mut canonical = format!("{namespace}://{kind}/{external_id}");
    if !quality.is_clean() {
        canonical.push('/');
        canonical.push_str(&quality.to_string());
    }
    if !quality.is_clean() || index > 0 {
        canonical.push('/');
        canonical.push_str(&index.to_string());
    }
    canonical
}

/// Derives content identities inside one namespace
#[derive(Debug, Clone)]
pub struct IdentityGenerator {
    namespace: String,
}

impl IdentityGenerator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Identity of one version; `index` defaults to 0
    pub fn identity(
        &self,
        kind: ContentKind,
        external_id: i64,
        quality: QualityTag,
        index: Option<u32>,
    ) -> ContentIdentity {
        ContentIdentity::from_canonical(&canonical_string(
            &self.namespace,
            kind,
            external_id,
            quality,
            index.unwrap_or(0),
        ))
    }

    /// Identity of the primary, untagged item
    pub fn primary(&self, kind: ContentKind, external_id: i64) -> ContentIdentity {
        self.identity(kind, external_id, QualityTag::Clean, None)
    }

    /// Identity of a child (season or episode) below a primary item
    pub fn child(&self, parent: &ContentIdentity, segment: &str) -> ContentIdentity {
        ContentIdentity::from_canonical(&format!("{}://item/{parent}/{segment}", self.namespace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn generator() -> IdentityGenerator {
        IdentityGenerator::new("vodresolve")
    }

    #[test]
    fn test_canonical_string_format() {
        assert_eq!(
            canonical_string("vodresolve", ContentKind::Movie, 603, QualityTag::Clean, 0),
            "vodresolve://movie/603"
        );
        assert_eq!(
            canonical_string("vodresolve", ContentKind::Movie, 603, QualityTag::FullHd, 1),
            "vodresolve://movie/603/1080p/1"
        );
        assert_eq!(
            canonical_string("vodresolve", ContentKind::Series, 1399, QualityTag::Uhd4k, 0),
            "vodresolve://series/1399/4K/0"
        );
        assert_eq!(
            canonical_string("vodresolve", ContentKind::Movie, 603, QualityTag::Clean, 2),
            "vodresolve://movie/603/2"
        );
    }

    #[test]
    fn test_primary_identity_ignores_index_spelling() {
        let generator = generator();
        let explicit = generator.identity(ContentKind::Movie, 603, QualityTag::Clean, Some(0));
        let defaulted = generator.identity(ContentKind::Movie, 603, QualityTag::Clean, None);

        assert_eq!(explicit, defaulted);
        assert_eq!(explicit, generator.primary(ContentKind::Movie, 603));
    }

    #[test]
    fn test_identity_matches_known_digest_prefix() {
        // First 16 bytes of SHA-256("vodresolve://movie/603")
        let identity = generator().primary(ContentKind::Movie, 603);
        assert_eq!(identity.to_string(), "f78c45219a9486cb1d595276e380cba5");
    }

    #[test]
    fn test_distinct_inputs_distinct_identities() {
        let generator = generator();
        let primary = generator.primary(ContentKind::Movie, 603);
        let hd = generator.identity(ContentKind::Movie, 603, QualityTag::FullHd, Some(0));
        let hd2 = generator.identity(ContentKind::Movie, 603, QualityTag::FullHd, Some(1));
        let series = generator.primary(ContentKind::Series, 603);
        let other_ns = IdentityGenerator::new("other").primary(ContentKind::Movie, 603);

        let all = [primary, hd, hd2, series, other_ns];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    proptest! {
        #[test]
        fn test_identity_is_deterministic(
            external_id in any::<i64>(),
            index in 0u32..10,
            quality in prop_oneof![
                Just(QualityTag::Clean),
                Just(QualityTag::Uhd4k),
                Just(QualityTag::FullHd),
                Just(QualityTag::Hd),
                Just(QualityTag::Unknown),
            ],
        ) {
            let first = generator().identity(ContentKind::Movie, external_id, quality, Some(index));
            let second = IdentityGenerator::new("vodresolve")
                .identity(ContentKind::Movie, external_id, quality, Some(index));
            prop_assert_eq!(first, second);
        }
    }
}
