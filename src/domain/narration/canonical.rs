//! Deterministic substitutions applied to narration text before hashing
//! and synthesis, so trivial formatting differences do not defeat the
//! audio cache.

use once_cell::sync::Lazy;
use regex::Regex;

// Fill-in-the-blank content renders blanks as underscore runs; spoken
// aloud they read as "dash".
static UNDERSCORE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

// A division written `12 / 4` is read as "slash" by most synthesizers;
// the Unicode division sign is spoken as "divided by".
static NUMERIC_DIVISION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").unwrap());

/// Canonicalize narration text. Order-sensitive, global, left-to-right,
/// non-overlapping; applying it twice yields the same result as once.
pub fn canonicalize_narration_text(text: &str) -> String {
    let text = UNDERSCORE_RUN_RE.replace_all(text, "dash");
    NUMERIC_DIVISION_RE.replace_all(&text, "$1 ÷ $2").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_underscore_run_becomes_dash() {
        assert_eq!(canonicalize_narration_text("a___b"), "adashb");
        assert_eq!(canonicalize_narration_text("fill in __ here"), "fill in dash here");
    }

    #[test]
    fn test_single_underscore_is_kept() {
        assert_eq!(canonicalize_narration_text("snake_case"), "snake_case");
    }

    #[test]
    fn test_numeric_division_with_spaces() {
        assert_eq!(
            canonicalize_narration_text("12 / 4 apples"),
            "12 ÷ 4 apples"
        );
    }

    #[test]
    fn test_numeric_division_without_spaces() {
        assert_eq!(canonicalize_narration_text("12/4"), "12 ÷ 4");
    }

    #[test]
    fn test_division_requires_digits_on_both_sides() {
        assert_eq!(canonicalize_narration_text("either/or"), "either/or");
        assert_eq!(canonicalize_narration_text("12/x"), "12/x");
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        for input in [
            "a___b and 12 / 4 apples",
            "____",
            "3/4 + 1/2",
            "plain text untouched",
        ] {
            let once = canonicalize_narration_text(input);
            let twice = canonicalize_narration_text(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }
}
