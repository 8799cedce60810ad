//! Wire schema, validation, and the monotonic merge
//!
//! The server's payload is `{ version, lastUpdated, resources: [...] }`
//! where each resource describes one crisis service. Only `domain` and
//! `aliases` matter to the engine; the rest is directory metadata for the
//! dashboard.
//!
//! Parsing is deliberately two-stage: the envelope must be well-formed
//! (version + resources array), but individual resources are decoded one
//! by one and malformed ones dropped. One bad row in a server export must
//! not cost the update.

use serde::Deserialize;
use serde_json::Value;

use hv_core::snapshot::AllowlistSnapshot;
use hv_core::storage::AllowlistStorage;
use hv_core::store::AllowlistStore;

/// One crisis service as the server describes it.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteResource {
    #[serde(default)]
    pub id: Value,
    pub domain: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub regional: bool,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    version: String,
    #[serde(rename = "lastUpdated")]
    #[serde(default)]
    #[allow(dead_code)]
    last_updated: Option<String>,
    resources: Vec<Value>,
}

// =============================================================================
// Validation
// =============================================================================

/// Result of schema-validating a sync response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadValidation {
    Valid {
        version: String,
        domains: Vec<String>,
    },
    Invalid {
        reason: String,
    },
}

/// Validate a response body and flatten it to a domain list.
///
/// `Invalid` whenever the body is not JSON, the envelope is missing its
/// version or resources array, the version is blank, the resources array
/// is empty, or no resource survives the per-row decode. Callers route
/// every `Invalid` to the keep-cached branch.
pub fn validate_payload(body: &str) -> PayloadValidation {
    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return PayloadValidation::Invalid {
                reason: format!("malformed body: {e}"),
            }
        }
    };

    if envelope.version.trim().is_empty() {
        return PayloadValidation::Invalid {
            reason: "blank version".to_string(),
        };
    }

    if envelope.resources.is_empty() {
        return PayloadValidation::Invalid {
            reason: "empty resources array".to_string(),
        };
    }

    let total = envelope.resources.len();
    let mut domains = Vec::new();
    let mut dropped = 0usize;

    for value in envelope.resources {
        match serde_json::from_value::<RemoteResource>(value) {
            Ok(resource) => collect_domains(&resource, &mut domains),
            Err(_) => dropped += 1,
        }
    }

    if dropped > 0 {
        log::debug!("allowlist payload: dropped {dropped}/{total} malformed resources");
    }

    if domains.is_empty() {
        return PayloadValidation::Invalid {
            reason: "no usable domains".to_string(),
        };
    }

    PayloadValidation::Valid {
        version: envelope.version,
        domains,
    }
}

/// Case-folded primary domain plus aliases; blanks skipped.
fn collect_domains(resource: &RemoteResource, out: &mut Vec<String>) {
    let primary = resource.domain.trim().to_ascii_lowercase();
    if !primary.is_empty() {
        out.push(primary);
    }
    for alias in &resource.aliases {
        let alias = alias.trim().to_ascii_lowercase();
        if !alias.is_empty() {
            out.push(alias);
        }
    }
}

// =============================================================================
// Applying a Payload
// =============================================================================

/// What applying a payload did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadOutcome {
    /// New version merged and swapped in.
    Changed,
    /// Same version as cached; freshness stamp refreshed.
    Unchanged,
    /// Payload failed validation; store untouched.
    Rejected(String),
}

/// Validate `body` against the cached version and fold it into the store.
///
/// Used by the HTTP client and, in the extension, by the wasm bindings
/// after the host has done the fetch. Never shrinks the allowlist: a new
/// version is unioned with the bundled floor before the swap.
pub fn apply_payload(
    body: &str,
    store: &AllowlistStore,
    storage: &dyn AllowlistStorage,
) -> PayloadOutcome {
    match validate_payload(body) {
        PayloadValidation::Valid { version, domains } => {
            if version == store.version() {
                store.touch(storage);
                return PayloadOutcome::Unchanged;
            }
            store.replace(AllowlistSnapshot::merged(&version, domains), storage);
            PayloadOutcome::Changed
        }
        PayloadValidation::Invalid { reason } => PayloadOutcome::Rejected(reason),
    }
}
