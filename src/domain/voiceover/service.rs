use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use uuid::Uuid;

use crate::domain::narration::narration_text_from_markup;
use crate::domain::voiceover::audio;
use crate::domain::voiceover::error::VoiceoverServiceError;
use crate::domain::voiceover::model::{
    decide_replacement, narration_hash, CachedVoiceover, ReplacementDecision, TokenOffset,
    Voiceover,
};
use crate::infrastructure::repositories::{
    AudioBlobRepository, SynthesisRepository, VoiceoverCacheRepository,
};

const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Blob-store path convention for voiceover audio.
pub fn audio_blob_path(filename: &str) -> String {
    format!("audio/{}", filename)
}

/// Generate a fresh voiceover filename: content id, language accent code
/// and a random 10-character suffix. Uniqueness is best-effort; every
/// regeneration request writes to its own filename, so concurrent
/// requests never collide at the blob layer.
pub fn generate_voiceover_filename(content_id: &str, language_accent_code: &str) -> String {
    let digest = format!("{:x}", md5::compute(Uuid::new_v4().as_bytes()));
    format!(
        "{}-{}-{}.mp3",
        content_id,
        language_accent_code,
        &digest[..10]
    )
}

pub struct VoiceoverService {
    cache_repo: Arc<dyn VoiceoverCacheRepository>,
    blob_repo: Arc<dyn AudioBlobRepository>,
    synthesis_repo: Arc<dyn SynthesisRepository>,
    memory_cache: Option<Cache<String, CachedVoiceover>>,
}

impl VoiceoverService {
    pub fn new(
        cache_repo: Arc<dyn VoiceoverCacheRepository>,
        blob_repo: Arc<dyn AudioBlobRepository>,
        synthesis_repo: Arc<dyn SynthesisRepository>,
        memory_cache_enabled: bool,
    ) -> Self {
        // Optional in-process layer in front of the durable cache store.
        let memory_cache = if memory_cache_enabled {
            Some(
                Cache::builder()
                    .max_capacity(1000)
                    .time_to_idle(Duration::from_secs(30 * 60)) // 30 minutes, refreshes on access
                    .build(),
            )
        } else {
            None
        };

        Self {
            cache_repo,
            blob_repo,
            synthesis_repo,
            memory_cache,
        }
    }
}

#[async_trait]
pub trait VoiceoverServiceApi: Send + Sync {
    /// Synthesize narration audio for a piece of lesson markup.
    ///
    /// This operation:
    /// - Normalizes the markup into canonical narration text
    /// - Reuses cached audio when the exact same text was synthesized
    ///   before for this language accent code and provider
    /// - Otherwise calls the synthesis provider and updates the cache
    /// - Commits the audio bytes under `audio/<voiceover_filename>`
    ///
    /// Returns the token offsets for the committed audio.
    async fn synthesize_narration_audio(
        &self,
        markup: &str,
        language_accent_code: &str,
        voiceover_filename: &str,
    ) -> Result<Vec<TokenOffset>, VoiceoverServiceError>;

    /// Full regeneration flow: generate a fresh filename, run the
    /// pipeline, read the committed bytes back and assemble the
    /// descriptor the caller persists.
    async fn regenerate_voiceover(
        &self,
        content_id: &str,
        markup: &str,
        language_accent_code: &str,
    ) -> Result<(Voiceover, Vec<TokenOffset>), VoiceoverServiceError>;

    /// Build the audio descriptor for committed voiceover bytes.
    fn build_audio_descriptor(
        &self,
        filename: &str,
        audio: &[u8],
    ) -> Result<Voiceover, VoiceoverServiceError>;
}

#[async_trait]
impl VoiceoverServiceApi for VoiceoverService {
    async fn synthesize_narration_audio(
        &self,
        markup: &str,
        language_accent_code: &str,
        voiceover_filename: &str,
    ) -> Result<Vec<TokenOffset>, VoiceoverServiceError> {
        // 1. Flatten the markup and canonicalize the narration text.
        let narration_text = narration_text_from_markup(markup);
        if narration_text.is_empty() {
            return Err(VoiceoverServiceError::Invalid(
                "Markup contains no narratable text".to_string(),
            ));
        }

        let text_hash = narration_hash(&narration_text);
        let provider = self.synthesis_repo.provider_id();

        tracing::info!(
            text_hash = %text_hash,
            language_accent_code = language_accent_code,
            provider = provider,
            markup_length = markup.len(),
            narration_length = narration_text.len(),
            "Voiceover synthesis request"
        );

        // 2. Cache lookup. Retrieval failures are logged and downgraded
        // to a miss; a cache outage must never block regeneration.
        let cached = self
            .lookup_cached(&text_hash, language_accent_code, provider)
            .await;

        // 3. Verify the hit: hash equality alone is a probable collision,
        // only exact plaintext equality counts. A verified hit still
        // needs its audio present in the blob store; when the blob is
        // gone the whole hit (offsets included) is discarded.
        let mut cached_for_store = cached.clone();
        let mut reused: Option<(Vec<u8>, Vec<TokenOffset>)> = None;
        if let Some(entry) = &cached {
            if entry.plaintext == narration_text {
                match self
                    .blob_repo
                    .get(&audio_blob_path(&entry.voiceover_filename))
                    .await
                {
                    Ok(cached_audio) => {
                        tracing::info!(
                            text_hash = %text_hash,
                            cached_filename = %entry.voiceover_filename,
                            cached_audio_size = cached_audio.len(),
                            "Voiceover cache hit"
                        );
                        reused = Some((cached_audio, entry.token_offsets.clone()));
                    }
                    Err(err) => {
                        tracing::error!(
                            error = %err,
                            cached_filename = %entry.voiceover_filename,
                            "Failed to retrieve voiceover from cache: audio blob missing, falling back to synthesis"
                        );
                        cached_for_store = None;
                    }
                }
            } else {
                tracing::warn!(
                    text_hash = %text_hash,
                    "Cached plaintext differs from narration text, treating as hash collision"
                );
            }
        }

        // 4. Synthesize on a miss or a discarded hit. Provider failures
        // arrive as error-detail strings and surface as a single error.
        let (audio_data, token_offsets, from_cache) = match reused {
            Some((audio_data, offsets)) => (audio_data, offsets, true),
            None => {
                let speech = self
                    .synthesis_repo
                    .synthesize(&narration_text, language_accent_code)
                    .await
                    .map_err(VoiceoverServiceError::Synthesis)?;
                (speech.audio, speech.token_offsets, false)
            }
        };

        // 5. Fresh or reused, the caller's target filename must exist in
        // blob storage afterwards. A commit failure aborts the request:
        // there is no audio to return without it.
        self.blob_repo
            .commit(
                &audio_blob_path(voiceover_filename),
                &audio_data,
                AUDIO_MIME_TYPE,
            )
            .await
            .map_err(|e| VoiceoverServiceError::Storage(e.to_string()))?;

        // 6. Update the cache for freshly synthesized audio.
        if !from_cache {
            self.store_in_cache(
                cached_for_store,
                &text_hash,
                language_accent_code,
                provider,
                &narration_text,
                voiceover_filename,
                &token_offsets,
            )
            .await;
        }

        Ok(token_offsets)
    }

    async fn regenerate_voiceover(
        &self,
        content_id: &str,
        markup: &str,
        language_accent_code: &str,
    ) -> Result<(Voiceover, Vec<TokenOffset>), VoiceoverServiceError> {
        let voiceover_filename = generate_voiceover_filename(content_id, language_accent_code);

        let token_offsets = self
            .synthesize_narration_audio(markup, language_accent_code, &voiceover_filename)
            .await?;

        let audio_data = self
            .blob_repo
            .get(&audio_blob_path(&voiceover_filename))
            .await
            .map_err(|e| VoiceoverServiceError::Storage(e.to_string()))?;

        let voiceover = self.build_audio_descriptor(&voiceover_filename, &audio_data)?;

        tracing::info!(
            content_id = content_id,
            filename = %voiceover.filename,
            duration_secs = voiceover.duration_secs,
            file_size_bytes = voiceover.file_size_bytes,
            token_count = token_offsets.len(),
            "Voiceover regenerated"
        );

        Ok((voiceover, token_offsets))
    }

    fn build_audio_descriptor(
        &self,
        filename: &str,
        audio_data: &[u8],
    ) -> Result<Voiceover, VoiceoverServiceError> {
        audio::build_voiceover(filename, audio_data)
    }
}

impl VoiceoverService {
    /// Composite cache lookup: in-process layer first (when enabled),
    /// then the durable store. Storage errors are swallowed into a miss.
    async fn lookup_cached(
        &self,
        text_hash: &str,
        language_accent_code: &str,
        provider: &str,
    ) -> Option<CachedVoiceover> {
        let memory_key = memory_cache_key(text_hash, language_accent_code, provider);
        if let Some(cache) = &self.memory_cache {
            if let Some(entry) = cache.get(&memory_key).await {
                tracing::debug!(text_hash = %text_hash, "Voiceover found in memory cache");
                return Some(entry);
            }
        }

        match self
            .cache_repo
            .find_by_key(text_hash, language_accent_code, provider)
            .await
        {
            Ok(Some(entry)) => {
                if let Some(cache) = &self.memory_cache {
                    cache.insert(memory_key, entry.clone()).await;
                }
                Some(entry)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    text_hash = %text_hash,
                    "Failed to retrieve voiceover from cache"
                );
                None
            }
        }
    }

    /// Apply the single-slot store policy after a fresh synthesis:
    /// no prior entry creates one unconditionally, a colliding entry is
    /// replaced only when the new text is shorter. Store failures are
    /// logged, not propagated: the synthesized audio is already
    /// committed, so skipping the cache is the safe fallback.
    #[allow(clippy::too_many_arguments)]
    async fn store_in_cache(
        &self,
        existing: Option<CachedVoiceover>,
        text_hash: &str,
        language_accent_code: &str,
        provider: &str,
        narration_text: &str,
        voiceover_filename: &str,
        token_offsets: &[TokenOffset],
    ) {
        let now = Utc::now();
        let entry = match existing {
            Some(existing_entry) => {
                if existing_entry.plaintext == narration_text {
                    // Entry already holds this exact text; nothing to do.
                    return;
                }
                match decide_replacement(&existing_entry.plaintext, narration_text) {
                    ReplacementDecision::KeepExisting => {
                        tracing::info!(
                            text_hash = %text_hash,
                            "Keeping existing cache entry for colliding key"
                        );
                        return;
                    }
                    ReplacementDecision::Replace => CachedVoiceover {
                        plaintext: narration_text.to_string(),
                        voiceover_filename: voiceover_filename.to_string(),
                        token_offsets: token_offsets.to_vec(),
                        updated_at: now,
                        ..existing_entry
                    },
                }
            }
            None => CachedVoiceover {
                text_hash: text_hash.to_string(),
                language_accent_code: language_accent_code.to_string(),
                provider: provider.to_string(),
                plaintext: narration_text.to_string(),
                voiceover_filename: voiceover_filename.to_string(),
                token_offsets: token_offsets.to_vec(),
                created_at: now,
                updated_at: now,
            },
        };

        match self.cache_repo.upsert(&entry).await {
            Ok(()) => {
                if let Some(cache) = &self.memory_cache {
                    let memory_key =
                        memory_cache_key(text_hash, language_accent_code, provider);
                    cache.insert(memory_key, entry).await;
                }
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    text_hash = %text_hash,
                    "Failed to store voiceover in cache"
                );
            }
        }
    }
}

fn memory_cache_key(text_hash: &str, language_accent_code: &str, provider: &str) -> String {
    format!("{}:{}:{}", text_hash, language_accent_code, provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_filename_shape() {
        let filename = generate_voiceover_filename("content_7", "en-US");
        assert!(filename.starts_with("content_7-en-US-"));
        assert!(filename.ends_with(".mp3"));

        let suffix = filename
            .strip_prefix("content_7-en-US-")
            .and_then(|rest| rest.strip_suffix(".mp3"))
            .unwrap();
        assert_eq!(suffix.len(), 10);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_filenames_are_unique() {
        let first = generate_voiceover_filename("c1", "en-US");
        let second = generate_voiceover_filename("c1", "en-US");
        assert_ne!(first, second);
    }

    #[test]
    fn test_audio_blob_path_convention() {
        assert_eq!(audio_blob_path("x.mp3"), "audio/x.mp3");
    }
}
