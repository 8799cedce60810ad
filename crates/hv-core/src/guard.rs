//! Protection decision entry point
//!
//! This is the hot path: the capture pipeline calls
//! [`Guard::is_url_protected`] before every capture and expects an answer
//! well inside 10 ms. The check is synchronous, does no I/O, and never
//! waits on a sync in progress; it runs against whichever index is live.
//!
//! The failure contract is asymmetric on purpose. A URL that cannot be a
//! web page is not protected. Everything else that goes wrong (a web URL
//! that will not parse, a panic anywhere in the matching code) resolves
//! to "protected", because under-protecting is categorically worse than
//! over-protecting.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::domain::base_domain;
use crate::fuzzy::find_fuzzy_match;
use crate::host;
use crate::queue::QueueRecorder;
use crate::snapshot::DomainIndex;
use crate::store::AllowlistStore;

/// Why (or that) a URL is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Host or its base domain is on the allowlist.
    Exact,
    /// Within typo tolerance of an allowlisted domain.
    Fuzzy { distance: usize },
    /// Web URL with no parseable host; protected by default.
    MalformedUrl,
    /// Not a web URL (`about:`, `chrome:`, ...); nothing to protect.
    NotWeb,
    /// Checked and not on the allowlist.
    NotListed,
}

impl Protection {
    /// Collapse to the strict boolean the capture pipeline consumes.
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Protection::Exact | Protection::Fuzzy { .. } | Protection::MalformedUrl
        )
    }
}

/// The protection check, bound to a store and an optional fuzzy-match
/// recorder.
pub struct Guard {
    store: Arc<AllowlistStore>,
    recorder: Option<QueueRecorder>,
}

impl Guard {
    pub fn new(store: Arc<AllowlistStore>) -> Self {
        Self {
            store,
            recorder: None,
        }
    }

    /// Attach a recorder; fuzzy hits will be sent to it fire-and-forget.
    pub fn with_recorder(mut self, recorder: QueueRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Should capture be suppressed for this URL?
    ///
    /// Any panic below this point answers "yes".
    pub fn is_url_protected(&self, url: &str) -> bool {
        catch_unwind(AssertUnwindSafe(|| self.check_url(url).is_protected())).unwrap_or(true)
    }

    /// The full decision, with the reason. Same logic as
    /// [`is_url_protected`] minus the panic boundary.
    pub fn check_url(&self, url: &str) -> Protection {
        if !host::is_web_url(url) {
            return Protection::NotWeb;
        }

        let domain = match host::normalize_host(url) {
            Some(domain) => domain,
            None => return Protection::MalformedUrl,
        };

        let index = self.index();

        if index.contains(&domain) {
            return Protection::Exact;
        }

        // Subdomains of a protected domain are protected. This also keeps
        // distance 0 out of the fuzzy matcher.
        let base = base_domain(&domain);
        if base != domain && index.contains(&base) {
            return Protection::Exact;
        }

        if let Some(m) = find_fuzzy_match(&base, index.domains()) {
            if let Some(recorder) = &self.recorder {
                recorder.record(&base, m.matched_domain, m.distance);
            }
            return Protection::Fuzzy {
                distance: m.distance,
            };
        }

        Protection::NotListed
    }

    /// Version of the active allowlist. Diagnostic.
    pub fn allowlist_version(&self) -> String {
        self.store.version()
    }

    /// Number of protected domains. Diagnostic; never the domains
    /// themselves.
    pub fn protected_domain_count(&self) -> usize {
        self.store.domain_count()
    }

    // Startup race: a store that somehow came up empty still answers with
    // the bundled floor.
    fn index(&self) -> Arc<DomainIndex> {
        let index = self.store.current_index();
        if index.is_empty() {
            return DomainIndex::bundled();
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue;
    use crate::snapshot::{AllowlistSnapshot, BUNDLED_DOMAINS};
    use crate::storage::MemoryStorage;

    fn guard() -> Guard {
        Guard::new(Arc::new(AllowlistStore::from_bundled()))
    }

    #[test]
    fn test_exact_match_with_path() {
        assert!(guard().is_url_protected("https://988lifeline.org/chat"));
    }

    #[test]
    fn test_exact_match_www_form() {
        assert!(guard().is_url_protected("https://www.988lifeline.org/"));
    }

    #[test]
    fn test_every_bundled_domain_is_covered() {
        let guard = guard();
        for domain in BUNDLED_DOMAINS {
            assert!(
                guard.is_url_protected(&format!("https://{domain}/anything")),
                "not protected: {domain}"
            );
            assert!(
                guard.is_url_protected(&format!("https://www.{domain}/anything")),
                "www form not protected: {domain}"
            );
        }
    }

    #[test]
    fn test_subdomain_is_protected() {
        let guard = guard();
        assert_eq!(
            guard.check_url("https://chat.988lifeline.org/start"),
            Protection::Exact
        );
    }

    #[test]
    fn test_fuzzy_typo_is_protected() {
        let guard = guard();
        assert_eq!(
            guard.check_url("https://988lifelne.org"),
            Protection::Fuzzy { distance: 1 }
        );
    }

    #[test]
    fn test_two_edit_typo_is_protected() {
        assert!(guard().is_url_protected("https://988lifelie.og"));
    }

    #[test]
    fn test_short_domains_are_exact_only() {
        let guard = guard();
        // bit.ly itself: exact.
        assert!(guard.is_url_protected("https://bit.ly/abc123"));
        // A near-miss of a short entry never fuzzy-matches.
        assert_eq!(guard.check_url("https://bit.lx"), Protection::NotListed);
        assert_eq!(guard.check_url("https://bat.ly"), Protection::NotListed);
    }

    #[test]
    fn test_unrelated_domain_not_protected() {
        let guard = guard();
        assert!(!guard.is_url_protected("https://example.com"));
        assert!(!guard.is_url_protected("https://news.ycombinator.com/item?id=1"));
    }

    #[test]
    fn test_non_web_urls_not_protected() {
        let guard = guard();
        assert_eq!(guard.check_url("about:blank"), Protection::NotWeb);
        assert_eq!(guard.check_url("chrome://settings"), Protection::NotWeb);
        assert_eq!(guard.check_url("data:text/html,x"), Protection::NotWeb);
        assert_eq!(guard.check_url(""), Protection::NotWeb);
    }

    #[test]
    fn test_malformed_web_url_is_protected() {
        let guard = guard();
        assert_eq!(guard.check_url("https://"), Protection::MalformedUrl);
        assert_eq!(guard.check_url("https:///nohost"), Protection::MalformedUrl);
        assert!(guard.is_url_protected("https://"));
    }

    #[test]
    fn test_fuzzy_hit_records_to_queue() {
        let (recorder, drain) = queue::channel();
        let guard = Guard::new(Arc::new(AllowlistStore::from_bundled())).with_recorder(recorder);

        assert!(guard.is_url_protected("https://988lifelne.org/path?q=1"));

        let mut queue = queue::ImprovementQueue::new();
        assert_eq!(drain.drain_into(&mut queue), 1);
        let record = queue.iter().next().unwrap();
        assert_eq!(record.candidate_domain, "988lifelne.org");
        assert_eq!(record.matched_domain, "988lifeline.org");
        assert_eq!(record.distance, 1);
    }

    #[test]
    fn test_exact_match_does_not_record() {
        let (recorder, drain) = queue::channel();
        let guard = Guard::new(Arc::new(AllowlistStore::from_bundled())).with_recorder(recorder);

        assert!(guard.is_url_protected("https://988lifeline.org"));

        let mut queue = queue::ImprovementQueue::new();
        assert_eq!(drain.drain_into(&mut queue), 0);
    }

    #[test]
    fn test_synced_domain_is_protected() {
        let storage = MemoryStorage::new();
        let store = Arc::new(AllowlistStore::load(&storage));
        let guard = Guard::new(store.clone());

        assert!(!guard.is_url_protected("https://example-helpline.org"));

        store.replace(
            AllowlistSnapshot::merged("v2", ["example-helpline.org"]),
            &storage,
        );

        // Same guard, post-sync index.
        assert!(guard.is_url_protected("https://example-helpline.org"));
    }

    #[test]
    fn test_diagnostics() {
        let guard = guard();
        assert_eq!(guard.allowlist_version(), "bundled-v1");
        assert_eq!(guard.protected_domain_count(), BUNDLED_DOMAINS.len());
    }
}
