//! Title normalization
//!
//! Canonicalizes a raw song title or guess into a comparable form before
//! fuzzy matching. Pure and deterministic; empty input yields empty output.

use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[].*?[\)\]]").expect("bracketed-segment regex"));
static HYPHEN_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-.*").expect("hyphen-suffix regex"));
static FEATURING_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(feat|ft|featuring)\b.*").expect("featuring-suffix regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Canonicalize a title for comparison.
///
/// In order: lower-case, drop parenthesized/bracketed segments
/// ("(Remix)", "[Live]"), truncate at the first hyphen ("- Remastered 2011"),
/// strip from the first "feat"/"ft"/"featuring" onward, turn underscores
/// into spaces, collapse whitespace runs, trim.
pub fn normalize_title(raw: &str) -> String {
    let title = raw.to_lowercase();
    let title = BRACKETED_SEGMENT.replace_all(&title, "");
    let title = HYPHEN_SUFFIX.replace(&title, "");
    let title = FEATURING_SUFFIX.replace(&title, "");
    let title = title.replace('_', " ");
    let title = WHITESPACE_RUN.replace_all(&title, " ");
    title.trim().to_string()
}
