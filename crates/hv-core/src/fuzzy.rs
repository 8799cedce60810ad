//! Typo-tolerant domain matching
//!
//! A visit to `988lifelne.org` should be treated like a visit to
//! `988lifeline.org`: the child typed the address by hand and missed a
//! key, and the protective decision must not hinge on that. Matching is a
//! bounded Levenshtein distance over base domains with tight guards, since
//! edit distance 2 over short strings matches far too much.
//!
//! The hot path calls [`find_fuzzy_match`] only after the exact lookups
//! have failed, so a distance of 0 cannot occur here.

/// Maximum edit distance accepted as a typo.
pub const MAX_EDIT_DISTANCE: usize = 2;

/// Inputs and candidates shorter than this are exact-match-only.
/// Short domains (URL shorteners, two-label ccTLD names) collide with too
/// many unrelated strings at distance 2.
pub const MIN_FUZZY_LEN: usize = 10;

/// Hostname length cap, RFC 1035-derived. Anything longer is treated as
/// "no match" without computing.
pub const MAX_DOMAIN_LEN: usize = 256;

/// A non-exact match against the allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatch<'a> {
    pub matched_domain: &'a str,
    pub distance: usize,
}

// =============================================================================
// Bounded Levenshtein Distance
// =============================================================================

/// Compute the Levenshtein distance between `a` and `b`, bounded by
/// `max_distance`. Returns `max_distance + 1` whenever the real distance
/// exceeds the bound (or the inputs exceed [`MAX_DOMAIN_LEN`]), so callers
/// can compare without sentinel values.
///
/// Uses two rolling rows (O(min(m,n)) space). Three early exits keep the
/// worst case proportional to `O(n * max_distance)`:
/// length cap, length-difference lower bound, and a per-row running
/// minimum that aborts once every cell in a row exceeds the bound.
pub fn levenshtein_bounded(a: &str, b: &str, max_distance: usize) -> usize {
    let no_match = max_distance + 1;

    let a = a.as_bytes();
    let b = b.as_bytes();

    if a.len() > MAX_DOMAIN_LEN || b.len() > MAX_DOMAIN_LEN {
        return no_match;
    }

    // |len(a) - len(b)| is a lower bound on the edit distance.
    if a.len().abs_diff(b.len()) > max_distance {
        return no_match;
    }

    if a.is_empty() {
        return b.len().min(no_match);
    }
    if b.is_empty() {
        return a.len().min(no_match);
    }

    // Roll over the shorter string.
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr: Vec<usize> = vec![0; short.len() + 1];

    for (i, &lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];

        for (j, &sc) in short.iter().enumerate() {
            let cost = usize::from(lc != sc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
            row_min = row_min.min(curr[j + 1]);
        }

        // The minimum over a row never decreases in later rows.
        if row_min > max_distance {
            return no_match;
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[short.len()];
    if distance > max_distance {
        no_match
    } else {
        distance
    }
}

// =============================================================================
// Fuzzy Match Policy
// =============================================================================

/// Find the first protected domain within [`MAX_EDIT_DISTANCE`] of
/// `base_domain`, or `None`.
///
/// First-found wins rather than best-of: with a threshold of 2 and a
/// curated list, two candidates within range of the same input are rare
/// enough that the scan order does not matter.
pub fn find_fuzzy_match<'a, I>(base_domain: &str, candidates: I) -> Option<FuzzyMatch<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    if base_domain.len() < MIN_FUZZY_LEN || base_domain.len() > MAX_DOMAIN_LEN {
        return None;
    }

    let first = base_domain.as_bytes()[0].to_ascii_lowercase();

    for candidate in candidates {
        if candidate.len() < MIN_FUZZY_LEN {
            continue;
        }

        // A one-or-two-edit typo rarely changes the first character;
        // checking it first prunes almost every candidate.
        if candidate.as_bytes()[0].to_ascii_lowercase() != first {
            continue;
        }

        let distance = levenshtein_bounded(base_domain, candidate, MAX_EDIT_DISTANCE);
        if distance > 0 && distance <= MAX_EDIT_DISTANCE {
            return Some(FuzzyMatch {
                matched_domain: candidate,
                distance,
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical() {
        assert_eq!(levenshtein_bounded("988lifeline.org", "988lifeline.org", 2), 0);
    }

    #[test]
    fn test_distance_single_edits() {
        // substitution
        assert_eq!(levenshtein_bounded("988lifeline.org", "988lifelina.org", 2), 1);
        // deletion
        assert_eq!(levenshtein_bounded("988lifeline.org", "988lifelne.org", 2), 1);
        // insertion
        assert_eq!(levenshtein_bounded("988lifeline.org", "988lifelinee.org", 2), 1);
    }

    #[test]
    fn test_distance_transposition_costs_two() {
        assert_eq!(levenshtein_bounded("988lifeline.org", "988lifelien.org", 2), 2);
    }

    #[test]
    fn test_distance_exceeds_bound() {
        assert_eq!(levenshtein_bounded("988lifeline.org", "crisistextline.org", 2), 3);
        assert_eq!(levenshtein_bounded("abcdefghij", "zyxwvutsrq", 2), 3);
    }

    #[test]
    fn test_distance_length_diff_lower_bound() {
        // Skips the DP entirely.
        assert_eq!(levenshtein_bounded("abc", "abcdefgh", 2), 3);
    }

    #[test]
    fn test_distance_length_cap() {
        let long = "a".repeat(300);
        assert_eq!(levenshtein_bounded(&long, "988lifeline.org", 2), 3);
        assert_eq!(levenshtein_bounded("988lifeline.org", &long, 2), 3);
    }

    #[test]
    fn test_distance_empty_inputs() {
        assert_eq!(levenshtein_bounded("", "", 2), 0);
        assert_eq!(levenshtein_bounded("ab", "", 2), 2);
        assert_eq!(levenshtein_bounded("", "abc", 2), 3);
    }

    const CANDIDATES: &[&str] = &[
        "988lifeline.org",
        "crisistextline.org",
        "thehotline.org",
        "bit.ly",
    ];

    fn candidates() -> impl Iterator<Item = &'static str> {
        CANDIDATES.iter().copied()
    }

    #[test]
    fn test_fuzzy_match_typo() {
        let m = find_fuzzy_match("988lifelne.org", candidates()).unwrap();
        assert_eq!(m.matched_domain, "988lifeline.org");
        assert_eq!(m.distance, 1);
    }

    #[test]
    fn test_fuzzy_match_two_edits() {
        let m = find_fuzzy_match("988lifelie.og", candidates()).unwrap();
        assert_eq!(m.matched_domain, "988lifeline.org");
        assert_eq!(m.distance, 2);
    }

    #[test]
    fn test_fuzzy_rejects_short_input() {
        // "ac.ly" is two edits from "bit.ly" variants but far below the
        // length floor.
        assert_eq!(find_fuzzy_match("ac.ly", candidates()), None);
        assert_eq!(find_fuzzy_match("bit.lyy", candidates()), None);
    }

    #[test]
    fn test_fuzzy_skips_short_candidates() {
        // Long input near a short candidate never matches it.
        assert_eq!(find_fuzzy_match("bit.ly.example", candidates()), None);
    }

    #[test]
    fn test_fuzzy_rejects_oversized_input() {
        let long = "a".repeat(300);
        assert_eq!(find_fuzzy_match(&long, candidates()), None);
    }

    #[test]
    fn test_fuzzy_first_char_prefilter() {
        // "888lifeline.org" is distance 1 but starts with a different
        // character, so the prefilter drops it.
        assert_eq!(find_fuzzy_match("888lifeline.org", candidates()), None);
    }

    #[test]
    fn test_fuzzy_no_zero_distance() {
        // Exact strings are the exact matcher's job.
        assert_eq!(find_fuzzy_match("988lifeline.org", candidates()), None);
    }

    #[test]
    fn test_fuzzy_three_edits_not_matched() {
        assert_eq!(find_fuzzy_match("988lfelie.og", candidates()), None);
    }
}
