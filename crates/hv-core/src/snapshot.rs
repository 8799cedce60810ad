//! Allowlist snapshot and derived domain index
//!
//! The persisted form is an [`AllowlistSnapshot`]: a version string, a
//! freshness timestamp, and the flat set of protected domains. The bundled
//! default list ships with the extension and is a permanent floor: a
//! server sync can add to it but never remove from it, so coverage only
//! ever grows.
//!
//! The hot path never touches a snapshot directly; it runs against a
//! [`DomainIndex`] derived from one. Indexes are immutable once built and
//! only ever replaced wholesale.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version string of the list compiled into the binary.
pub const BUNDLED_VERSION: &str = "bundled-v1";

/// Crisis-support domains shipped with the extension. This is the
/// protection floor: present in every snapshot regardless of sync state.
///
/// Entries shorter than 10 characters are exact-match-only (see the fuzzy
/// policy); that covers the URL shorteners, which are listed because a
/// shortened link can resolve to any of the others.
pub const BUNDLED_DOMAINS: &[&str] = &[
    // Suicide prevention
    "988lifeline.org",
    "suicidepreventionlifeline.org",
    "crisistextline.org",
    "veteranscrisisline.net",
    "afsp.org",
    "save.org",
    "sprc.org",
    "jedfoundation.org",
    "imalive.org",
    "crisischat.org",
    "samaritans.org",
    "befrienders.org",
    "yourlifecounts.org",
    "crisisconnections.org",
    // Abuse and domestic violence
    "thehotline.org",
    "rainn.org",
    "childhelp.org",
    "childhelphotline.org",
    "loveisrespect.org",
    "stopitnow.org",
    "safehorizon.org",
    "nomore.org",
    // LGBTQ+ crisis support
    "thetrevorproject.org",
    "translifeline.org",
    "glbthotline.org",
    "itgetsbetter.org",
    // Runaway and youth services
    "1800runaway.org",
    "nationalrunawaysafeline.org",
    "kidshelpphone.ca",
    "kidshelpline.com.au",
    "childhelplineinternational.org",
    "teenline.org",
    "youthline.org",
    // Mental health and substance use
    "samhsa.gov",
    "findtreatment.gov",
    "nami.org",
    "mentalhealth.gov",
    "nationaleatingdisorders.org",
    // URL shorteners: destination unknowable, always skip capture
    "bit.ly",
    "t.co",
    "tinyurl.com",
    "goo.gl",
    "ow.ly",
    "is.gd",
    "buff.ly",
];

// =============================================================================
// Snapshot
// =============================================================================

/// Error type for snapshot validation.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot has no version")]
    MissingVersion,
    #[error("snapshot domain list is empty")]
    EmptyDomainList,
    #[error("snapshot is missing bundled default domains")]
    MissingFloor,
}

/// The persisted allowlist: version, freshness stamp, and domain set.
///
/// Serialized as `{ "version", "lastUpdated", "domains": [...] }` under
/// the `crisisAllowlist` storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistSnapshot {
    pub version: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
    pub domains: BTreeSet<String>,
}

impl AllowlistSnapshot {
    /// The compiled-in default snapshot.
    pub fn bundled() -> Self {
        Self {
            version: BUNDLED_VERSION.to_string(),
            last_updated: Utc::now(),
            domains: BUNDLED_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Build a snapshot from synced domains, unioned with the bundled
    /// floor. The floor survives every merge.
    pub fn merged<I, S>(version: &str, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all: BTreeSet<String> =
            BUNDLED_DOMAINS.iter().map(|d| d.to_string()).collect();
        all.extend(domains.into_iter().map(Into::into));

        Self {
            version: version.to_string(),
            last_updated: Utc::now(),
            domains: all,
        }
    }

    /// Check the snapshot invariants: a version, a non-empty domain set,
    /// and every bundled default present.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version.is_empty() {
            return Err(SnapshotError::MissingVersion);
        }
        if self.domains.is_empty() {
            return Err(SnapshotError::EmptyDomainList);
        }
        if !BUNDLED_DOMAINS.iter().all(|d| self.domains.contains(*d)) {
            return Err(SnapshotError::MissingFloor);
        }
        Ok(())
    }
}

// =============================================================================
// Domain Index
// =============================================================================

/// In-memory lookup structure derived from a snapshot.
///
/// Each stored domain contributes two exact-lookup keys (bare and
/// `www.`-prefixed) plus one entry in the bare-domain list the fuzzy
/// matcher scans. Built once per snapshot, then immutable.
#[derive(Debug, Default)]
pub struct DomainIndex {
    keys: HashSet<String>,
    bare: Vec<String>,
}

impl DomainIndex {
    /// Build an index from a snapshot's domain set.
    pub fn build(snapshot: &AllowlistSnapshot) -> Self {
        let mut keys = HashSet::with_capacity(snapshot.domains.len() * 2);
        let mut bare = Vec::with_capacity(snapshot.domains.len());

        for raw in &snapshot.domains {
            let domain = raw.trim().trim_matches('.').to_ascii_lowercase();
            let domain = domain.strip_prefix("www.").unwrap_or(&domain);
            if domain.is_empty() {
                continue;
            }

            if keys.insert(domain.to_string()) {
                bare.push(domain.to_string());
            }
            keys.insert(format!("www.{domain}"));
        }

        Self { keys, bare }
    }

    /// The index over the bundled defaults, built once.
    pub fn bundled() -> Arc<Self> {
        static BUNDLED: OnceLock<Arc<DomainIndex>> = OnceLock::new();
        BUNDLED
            .get_or_init(|| Arc::new(Self::build(&AllowlistSnapshot::bundled())))
            .clone()
    }

    /// O(1) exact membership check. The caller passes a normalized
    /// domain; `www.` variants are already materialized as keys.
    #[inline]
    pub fn contains(&self, domain: &str) -> bool {
        self.keys.contains(domain)
    }

    /// Bare protected domains, for the fuzzy scan.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.bare.iter().map(|d| d.as_str())
    }

    /// Number of distinct protected domains (not lookup keys).
    pub fn len(&self) -> usize {
        self.bare.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bare.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_snapshot_is_valid() {
        let snapshot = AllowlistSnapshot::bundled();
        assert!(snapshot.validate().is_ok());
        assert_eq!(snapshot.version, BUNDLED_VERSION);
        assert_eq!(snapshot.domains.len(), BUNDLED_DOMAINS.len());
    }

    #[test]
    fn test_merged_keeps_floor() {
        let snapshot = AllowlistSnapshot::merged("v7", ["example-helpline.org"]);
        assert!(snapshot.validate().is_ok());
        assert_eq!(snapshot.version, "v7");
        assert!(snapshot.domains.contains("example-helpline.org"));
        for d in BUNDLED_DOMAINS {
            assert!(snapshot.domains.contains(*d), "floor lost {d}");
        }
    }

    #[test]
    fn test_validate_rejects_empty() {
        let mut snapshot = AllowlistSnapshot::bundled();
        snapshot.domains.clear();
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::EmptyDomainList)
        ));
    }

    #[test]
    fn test_validate_rejects_missing_floor() {
        let mut snapshot = AllowlistSnapshot::bundled();
        snapshot.domains.remove("988lifeline.org");
        assert!(matches!(snapshot.validate(), Err(SnapshotError::MissingFloor)));
    }

    #[test]
    fn test_validate_rejects_missing_version() {
        let mut snapshot = AllowlistSnapshot::bundled();
        snapshot.version.clear();
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::MissingVersion)
        ));
    }

    #[test]
    fn test_index_contains_both_forms() {
        let index = DomainIndex::build(&AllowlistSnapshot::bundled());
        assert!(index.contains("988lifeline.org"));
        assert!(index.contains("www.988lifeline.org"));
        assert!(index.contains("bit.ly"));
        assert!(!index.contains("chat.988lifeline.org"));
        assert!(!index.contains("example.com"));
    }

    #[test]
    fn test_index_canonicalizes_entries() {
        let snapshot = AllowlistSnapshot::merged("v1", ["WWW.Example-Helpline.ORG."]);
        let index = DomainIndex::build(&snapshot);
        assert!(index.contains("example-helpline.org"));
        assert!(index.contains("www.example-helpline.org"));
    }

    #[test]
    fn test_index_len_counts_domains_not_keys() {
        let index = DomainIndex::build(&AllowlistSnapshot::bundled());
        assert_eq!(index.len(), BUNDLED_DOMAINS.len());
    }

    #[test]
    fn test_snapshot_serde_layout() {
        let snapshot = AllowlistSnapshot::bundled();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("version").is_some());
        assert!(json.get("lastUpdated").is_some());
        assert!(json.get("domains").unwrap().is_array());

        let back: AllowlistSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
