use super::synthesis_repository::{split_text_into_batches, SynthesisRepository, SynthesizedSpeech};
use crate::domain::voiceover::audio;
use crate::domain::voiceover::model::TokenOffset;
use async_trait::async_trait;
use aws_sdk_polly::{
    types::{Engine, OutputFormat, SpeechMarkType, VoiceId},
    Client as PollyClient,
};
use serde::Deserialize;
use std::sync::Arc;

/// AWS Polly has a limit of 3000 characters per request
const MAX_BATCH_SIZE: usize = 3000;

/// One line of Polly's newline-delimited speech-mark JSON output.
#[derive(Debug, Deserialize)]
struct SpeechMark {
    time: f64,
    #[serde(rename = "type")]
    mark_type: String,
    value: String,
}

/// AWS Polly implementation of the synthesis repository. Produces MP3
/// audio plus word speech marks, which become the token offsets.
pub struct PollySynthesisRepository {
    polly_client: Arc<PollyClient>,
}

impl PollySynthesisRepository {
    pub fn new(polly_client: Arc<PollyClient>) -> Self {
        Self { polly_client }
    }

    /// Select the appropriate neural Polly voice for a language accent
    /// code. Unsupported accents are a synthesis error, not a fallback.
    fn voice_for_accent(language_accent_code: &str) -> Option<&'static str> {
        let voice = match language_accent_code {
            "en-US" => "Joanna",
            "en-GB" => "Amy",
            "en-AU" => "Olivia",
            "en-IN" => "Kajal",
            "es-ES" => "Lucia",
            "es-US" => "Lupe",
            "fr-FR" => "Lea",
            "fr-CA" => "Gabrielle",
            "de-DE" => "Vicki",
            "it-IT" => "Bianca",
            "pt-BR" => "Camila",
            "pt-PT" => "Ines",
            "hi-IN" => "Kajal",
            "ja-JP" => "Takumi",
            "ko-KR" => "Seoyeon",
            "zh-CN" => "Zhiyu",
            "ar-AE" => "Hala",
            "nl-NL" => "Laura",
            _ => return None,
        };
        Some(voice)
    }

    /// Call AWS Polly for the MP3 audio of a single text batch
    async fn call_polly_audio(&self, text: &str, voice_id: &VoiceId) -> Result<Vec<u8>, String> {
        tracing::info!(
            voice_id = ?voice_id,
            output_format = "Mp3",
            text_length = text.len(),
            text_preview = &text[..text.len().min(200)],
            "Calling AWS Polly synthesize_speech"
        );

        let result = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .voice_id(voice_id.clone())
            .output_format(OutputFormat::Mp3)
            .engine(Engine::Neural)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    voice_id = ?voice_id,
                    text_length = text.len(),
                    "AWS Polly synthesize_speech failed"
                );
                format!("AWS Polly error: {:?}", e)
            })?;

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to collect audio stream from Polly response");
            format!("Failed to read audio stream: {}", e)
        })?;

        let audio_bytes = audio_stream.into_bytes().to_vec();
        tracing::debug!(
            audio_size = audio_bytes.len(),
            "Audio stream collected successfully"
        );

        Ok(audio_bytes)
    }

    /// Call AWS Polly for the word speech marks of a single text batch
    async fn call_polly_speech_marks(
        &self,
        text: &str,
        voice_id: &VoiceId,
    ) -> Result<Vec<TokenOffset>, String> {
        let result = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .voice_id(voice_id.clone())
            .output_format(OutputFormat::Json)
            .speech_mark_types(SpeechMarkType::Word)
            .engine(Engine::Neural)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    voice_id = ?voice_id,
                    text_length = text.len(),
                    "AWS Polly speech-mark request failed"
                );
                format!("AWS Polly error: {:?}", e)
            })?;

        let mark_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to collect speech-mark stream from Polly response");
            format!("Failed to read speech mark stream: {}", e)
        })?;

        let raw = mark_stream.into_bytes();
        parse_speech_marks(&raw)
    }

    /// Synthesize the batches in order, merging audio and shifting each
    /// batch's speech marks by the playback time accumulated before it.
    async fn synthesize_batches(
        &self,
        batches: &[String],
        voice_id: &VoiceId,
    ) -> Result<SynthesizedSpeech, String> {
        let mut merged_audio = Vec::new();
        let mut merged_offsets = Vec::new();
        let mut elapsed_msecs = 0.0_f64;

        for (index, batch) in batches.iter().enumerate() {
            tracing::info!(
                batch_index = index,
                batch_size = batch.len(),
                "Synthesizing batch"
            );

            let audio_data = self.call_polly_audio(batch, voice_id).await?;
            let marks = self.call_polly_speech_marks(batch, voice_id).await?;

            merged_offsets.extend(marks.into_iter().map(|mark| TokenOffset {
                audio_offset_msecs: mark.audio_offset_msecs + elapsed_msecs,
                ..mark
            }));

            if batches.len() > 1 {
                let batch_duration_secs = audio::mp3_duration_secs(&audio_data)
                    .map_err(|e| format!("Failed to measure batch duration: {}", e))?;
                elapsed_msecs += batch_duration_secs * 1000.0;
            }

            merged_audio.extend(audio_data);

            tracing::info!(
                batch_index = index,
                total_audio_size = merged_audio.len(),
                total_token_count = merged_offsets.len(),
                "Batch synthesized and merged"
            );
        }

        Ok(SynthesizedSpeech {
            audio: merged_audio,
            token_offsets: merged_offsets,
        })
    }
}

/// Parse Polly's newline-delimited JSON speech marks into token offsets,
/// keeping word marks only.
fn parse_speech_marks(raw: &[u8]) -> Result<Vec<TokenOffset>, String> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| format!("Speech mark stream is not valid UTF-8: {}", e))?;

    let mut offsets = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mark: SpeechMark = serde_json::from_str(line)
            .map_err(|e| format!("Malformed speech mark line {:?}: {}", line, e))?;
        if mark.mark_type == "word" {
            offsets.push(TokenOffset {
                token: mark.value,
                audio_offset_msecs: mark.time,
            });
        }
    }

    Ok(offsets)
}

#[async_trait]
impl SynthesisRepository for PollySynthesisRepository {
    async fn synthesize(
        &self,
        text: &str,
        language_accent_code: &str,
    ) -> Result<SynthesizedSpeech, String> {
        let start_time = std::time::Instant::now();

        let voice_name = Self::voice_for_accent(language_accent_code).ok_or_else(|| {
            format!(
                "Unsupported language accent code for Polly: {}",
                language_accent_code
            )
        })?;
        let voice_id = VoiceId::from(voice_name);

        let batches = split_text_into_batches(text, MAX_BATCH_SIZE);
        tracing::info!(
            batch_count = batches.len(),
            text_length = text.len(),
            "Text split into batches"
        );

        let speech = self.synthesize_batches(&batches, &voice_id).await?;

        let duration = start_time.elapsed();
        tracing::info!(
            provider = "polly",
            voice = voice_name,
            language_accent_code = language_accent_code,
            latency_ms = duration.as_millis(),
            characters_count = text.len(),
            batch_count = batches.len(),
            audio_size_bytes = speech.audio.len(),
            token_count = speech.token_offsets.len(),
            "Voiceover synthesis completed"
        );

        Ok(speech)
    }

    fn provider_id(&self) -> &'static str {
        "polly"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speech_marks_keeps_words_only() {
        let raw = br#"{"time":6,"type":"word","start":0,"end":5,"value":"Hello"}
{"time":374,"type":"sentence","start":0,"end":12,"value":"Hello world."}
{"time":380,"type":"word","start":6,"end":11,"value":"world"}
"#;
        let offsets = parse_speech_marks(raw).unwrap();

        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[0].token, "Hello");
        assert_eq!(offsets[0].audio_offset_msecs, 6.0);
        assert_eq!(offsets[1].token, "world");
        assert_eq!(offsets[1].audio_offset_msecs, 380.0);
    }

    #[test]
    fn test_parse_speech_marks_empty_stream() {
        assert_eq!(parse_speech_marks(b"").unwrap().len(), 0);
    }

    #[test]
    fn test_parse_speech_marks_rejects_garbage() {
        assert!(parse_speech_marks(b"not json at all").is_err());
    }

    #[test]
    fn test_voice_for_accent() {
        assert_eq!(
            PollySynthesisRepository::voice_for_accent("en-US"),
            Some("Joanna")
        );
        assert_eq!(
            PollySynthesisRepository::voice_for_accent("pt-BR"),
            Some("Camila")
        );
        assert_eq!(PollySynthesisRepository::voice_for_accent("xx-XX"), None);
    }
}
