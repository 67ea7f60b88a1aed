use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// When a spoken token (word or punctuation) begins in the synthesized
/// audio. Only providers that report word timings produce these; reused
/// manual audio carries an empty sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenOffset {
    pub token: String,
    pub audio_offset_msecs: f64,
}

/// Descriptor for a committed voiceover audio file, handed to the caller
/// once per regeneration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voiceover {
    pub filename: String,
    pub file_size_bytes: i64,
    pub duration_secs: f64,
    pub needs_update: bool,
}

/// One cached synthesis result. A single slot per
/// (text_hash, language_accent_code, provider) key; see
/// [`decide_replacement`] for the collision policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedVoiceover {
    pub text_hash: String,
    pub language_accent_code: String,
    pub provider: String,
    pub plaintext: String,
    pub voiceover_filename: String,
    pub token_offsets: Vec<TokenOffset>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Content hash for cache keys: md5 hex of the canonical narration text.
/// Hash equality alone is never treated as a hit; the stored plaintext
/// must also match exactly.
pub fn narration_hash(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementDecision {
    KeepExisting,
    Replace,
}

/// Collision policy for the single cache slot: when two different texts
/// map to the same key, keep the shorter one. A shorter text is more
/// likely to recur across other content, so it is the better candidate
/// to hold the slot.
pub fn decide_replacement(
    existing_plaintext: &str,
    candidate_plaintext: &str,
) -> ReplacementDecision {
    if candidate_plaintext.chars().count() < existing_plaintext.chars().count() {
        ReplacementDecision::Replace
    } else {
        ReplacementDecision::KeepExisting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_narration_hash_is_stable_and_fixed_length() {
        let first = narration_hash("some narration text");
        let second = narration_hash("some narration text");
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_narration_hash_differs_for_different_text() {
        assert_ne!(narration_hash("one"), narration_hash("two"));
    }

    #[test]
    fn test_shorter_candidate_replaces() {
        assert_eq!(
            decide_replacement("a longer cached text", "short"),
            ReplacementDecision::Replace
        );
    }

    #[test]
    fn test_longer_candidate_is_rejected() {
        assert_eq!(
            decide_replacement("short", "a much longer candidate"),
            ReplacementDecision::KeepExisting
        );
    }

    #[test]
    fn test_equal_length_keeps_existing() {
        assert_eq!(
            decide_replacement("abc", "xyz"),
            ReplacementDecision::KeepExisting
        );
    }

    #[test]
    fn test_replacement_compares_characters_not_bytes() {
        // Four characters against three: kept out even though the
        // multi-byte text is "longer" in bytes.
        assert_eq!(
            decide_replacement("äöü", "abcd"),
            ReplacementDecision::KeepExisting
        );
        assert_eq!(
            decide_replacement("abcd", "äöü"),
            ReplacementDecision::Replace
        );
    }
}
