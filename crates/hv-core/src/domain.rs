//! Base-domain (registrable unit) extraction
//!
//! Reduces a hostname to its registrable portion so that subdomains of a
//! protected resource compare equal to the listed domain
//! (`chat.988lifeline.org` -> `988lifeline.org`).
//!
//! This uses a fixed table of known multi-label suffixes rather than the
//! full public suffix list. The table is intentionally small: every entry
//! widens what the fuzzy matcher sees as a base domain, so additions need
//! the false-positive rate re-checked. Known simplification, not a bug.

/// Multi-label public suffixes recognized by [`base_domain`].
pub const MULTI_LABEL_SUFFIXES: &[&str] = &["com.au", "co.uk", "org.uk", "com.br", "co.nz"];

/// Extract the base domain from an already-normalized hostname.
///
/// Leading/trailing dots and empty labels are dropped. Hostnames with two
/// or fewer labels are returned as-is; when the last two labels form a
/// known multi-label suffix the last three labels are kept, otherwise the
/// last two.
pub fn base_domain(domain: &str) -> String {
    let trimmed = domain.trim_matches('.');
    let labels: Vec<&str> = trimmed.split('.').filter(|l| !l.is_empty()).collect();
    let n = labels.len();

    if n <= 2 {
        return labels.join(".");
    }

    let last_two = format!("{}.{}", labels[n - 2], labels[n - 1]);
    if MULTI_LABEL_SUFFIXES.contains(&last_two.as_str()) {
        return labels[n - 3..].join(".");
    }

    labels[n - 2..].join(".")
}
