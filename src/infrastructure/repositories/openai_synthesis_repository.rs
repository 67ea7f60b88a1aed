use super::synthesis_repository::{split_text_into_batches, SynthesisRepository, SynthesizedSpeech};
use async_openai::{
    config::OpenAIConfig,
    types::{CreateSpeechRequest, SpeechModel, Voice},
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// OpenAI has a limit of 4096 characters per request
const MAX_BATCH_SIZE: usize = 4096;

/// OpenAI TTS implementation of the synthesis repository.
///
/// The speech endpoint reports no word timings, so the token-offset
/// sequence is always empty; callers that need per-token timing should
/// configure the Polly provider instead.
pub struct OpenAiSynthesisRepository {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiSynthesisRepository {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String) -> Self {
        Self { client, model }
    }

    /// Select an OpenAI voice by the primary language subtag of the
    /// accent code. The voices are multilingual; the mapping just picks
    /// a timbre that suits each language.
    fn voice_for_accent(language_accent_code: &str) -> Voice {
        let primary = language_accent_code
            .split('-')
            .next()
            .unwrap_or(language_accent_code);
        match primary {
            "en" => Voice::Alloy,
            "es" => Voice::Echo,
            "fr" => Voice::Nova,
            "de" => Voice::Onyx,
            "it" => Voice::Fable,
            "pt" => Voice::Shimmer,
            _ => Voice::Alloy,
        }
    }

    /// Call the OpenAI speech endpoint for a single text batch
    async fn call_openai(&self, text: &str, voice: Voice) -> Result<Vec<u8>, String> {
        tracing::info!(
            model = %self.model,
            voice = ?voice,
            text_length = text.len(),
            text_preview = &text[..text.len().min(200)],
            "Calling OpenAI TTS API"
        );

        let model = match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        };

        let request = CreateSpeechRequest {
            model,
            input: text.to_string(),
            voice,
            response_format: None, // Defaults to MP3
            speed: None,           // Defaults to 1.0
        };

        let response = self.client.audio().speech(request).await.map_err(|e| {
            tracing::error!(
                error = %e,
                model = %self.model,
                text_length = text.len(),
                "OpenAI TTS API call failed"
            );
            format!("OpenAI TTS error: {}", e)
        })?;

        let audio_bytes = response.bytes.to_vec();
        tracing::debug!(
            audio_size = audio_bytes.len(),
            "OpenAI TTS audio received successfully"
        );

        Ok(audio_bytes)
    }
}

#[async_trait]
impl SynthesisRepository for OpenAiSynthesisRepository {
    async fn synthesize(
        &self,
        text: &str,
        language_accent_code: &str,
    ) -> Result<SynthesizedSpeech, String> {
        let start_time = std::time::Instant::now();
        let voice = Self::voice_for_accent(language_accent_code);

        let batches = split_text_into_batches(text, MAX_BATCH_SIZE);
        tracing::info!(
            batch_count = batches.len(),
            text_length = text.len(),
            "Text split into batches"
        );

        let mut merged_audio = Vec::new();
        for (index, batch) in batches.iter().enumerate() {
            tracing::info!(
                batch_index = index,
                batch_size = batch.len(),
                "Synthesizing batch"
            );
            let audio_data = self.call_openai(batch, voice.clone()).await?;
            merged_audio.extend(audio_data);
        }

        let duration = start_time.elapsed();
        tracing::info!(
            provider = "openai",
            model = %self.model,
            language_accent_code = language_accent_code,
            latency_ms = duration.as_millis(),
            characters_count = text.len(),
            batch_count = batches.len(),
            audio_size_bytes = merged_audio.len(),
            "Voiceover synthesis completed, provider reports no word timings"
        );

        Ok(SynthesizedSpeech {
            audio: merged_audio,
            token_offsets: Vec::new(),
        })
    }

    fn provider_id(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_for_accent_uses_primary_subtag() {
        assert!(matches!(
            OpenAiSynthesisRepository::voice_for_accent("en-GB"),
            Voice::Alloy
        ));
        assert!(matches!(
            OpenAiSynthesisRepository::voice_for_accent("pt-BR"),
            Voice::Shimmer
        ));
        assert!(matches!(
            OpenAiSynthesisRepository::voice_for_accent("xx-XX"),
            Voice::Alloy
        ));
    }
}
