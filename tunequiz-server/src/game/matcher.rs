//! Fuzzy title matching
//!
//! Compares two normalized strings with a normalized edit-similarity ratio.
//! The acceptance threshold started at 0.90 and was tightened to 0.85 after
//! playtesting showed near-miss spellings being rejected; 0.85 still keeps
//! unrelated titles well below the bar.

/// Minimum similarity for a guess to count as correct
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Decide whether a normalized guess matches a normalized canonical title.
/// Exact equality short-circuits; otherwise normalized Levenshtein
/// similarity in `[0.0, 1.0]` is compared against the threshold.
pub fn is_title_match(normalized_guess: &str, normalized_title: &str) -> bool {
    if normalized_guess == normalized_title {
        return true;
    }
    strsim::normalized_levenshtein(normalized_guess, normalized_title)
        >= TITLE_SIMILARITY_THRESHOLD
}
