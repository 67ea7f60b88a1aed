use async_trait::async_trait;

use crate::domain::voiceover::model::TokenOffset;

/// Result of one synthesis call: the MP3 audio plus per-token timing,
/// when the provider reports it.
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub audio: Vec<u8>,
    pub token_offsets: Vec<TokenOffset>,
}

/// Repository for speech-synthesis operations.
/// Abstracts the underlying provider (AWS Polly, OpenAI, ...).
///
/// Implementations are responsible for:
/// - Handling provider-specific text length limitations
/// - Splitting text into batches and merging audio chunks if needed
/// - Provider-specific voice selection for a language accent code
///
/// Failures are returned as error-detail strings; the orchestrator
/// surfaces a non-empty detail as a single synthesis error. Retries,
/// timeouts and backoff live in the provider SDKs, not here.
#[async_trait]
pub trait SynthesisRepository: Send + Sync {
    /// Synthesize narration text for a given language accent code.
    async fn synthesize(
        &self,
        text: &str,
        language_accent_code: &str,
    ) -> Result<SynthesizedSpeech, String>;

    /// Stable provider identifier; part of the voiceover cache key, so
    /// audio synthesized by one provider is never reused for another.
    fn provider_id(&self) -> &'static str;
}

/// Split text into provider-sized batches, preferring sentence
/// boundaries. Text without sentence-ending punctuation is split by
/// characters as a last resort.
pub(crate) fn split_text_into_batches(text: &str, max_batch_size: usize) -> Vec<String> {
    if text.len() <= max_batch_size {
        return vec![text.to_string()];
    }

    let sentence_pattern = regex::Regex::new(r"([.!?]+\s+)").unwrap();

    let mut batches = Vec::new();
    let mut current_batch = String::new();
    let push_chunk = |chunk: &str, batches: &mut Vec<String>, current: &mut String| {
        if !current.is_empty() && current.len() + chunk.len() > max_batch_size {
            batches.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(chunk);
    };

    let mut last_end = 0;
    for mat in sentence_pattern.find_iter(text) {
        push_chunk(&text[last_end..mat.end()], &mut batches, &mut current_batch);
        last_end = mat.end();
    }

    // Remaining text after the last sentence boundary.
    if last_end < text.len() {
        let remaining = &text[last_end..];
        if remaining.len() > max_batch_size {
            if !current_batch.is_empty() {
                batches.push(current_batch.trim().to_string());
                current_batch = String::new();
            }
            let chars: Vec<char> = remaining.chars().collect();
            for chunk in chars.chunks(max_batch_size) {
                batches.push(chunk.iter().collect());
            }
        } else {
            push_chunk(remaining, &mut batches, &mut current_batch);
        }
    }

    if !current_batch.is_empty() {
        batches.push(current_batch.trim().to_string());
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 3000;

    #[test]
    fn test_small_text_is_a_single_batch() {
        let text = "This is a short text.";
        let batches = split_text_into_batches(text, MAX);
        assert_eq!(batches, vec![text.to_string()]);
    }

    #[test]
    fn test_batches_respect_max_size() {
        let text = "This is a sentence. ".repeat(300);
        let batches = split_text_into_batches(&text, MAX);

        assert!(batches.len() > 1);
        for batch in &batches {
            assert!(
                batch.len() <= MAX,
                "batch of {} chars exceeds limit",
                batch.len()
            );
        }
    }

    #[test]
    fn test_batches_preserve_words() {
        let text = "This is sentence number X. ".repeat(300);
        let batches = split_text_into_batches(&text, MAX);

        let reconstructed = batches.join(" ");
        assert_eq!(
            text.split_whitespace().count(),
            reconstructed.split_whitespace().count()
        );
    }

    #[test]
    fn test_text_without_punctuation_splits_by_characters() {
        let text = "a".repeat(MAX + 500);
        let batches = split_text_into_batches(&text, MAX);

        assert!(batches.len() >= 2);
        for batch in &batches {
            assert!(batch.len() <= MAX);
        }
    }

    #[test]
    fn test_exactly_max_size_stays_whole() {
        let text = "a".repeat(MAX);
        let batches = split_text_into_batches(&text, MAX);
        assert_eq!(batches.len(), 1);
    }
}
