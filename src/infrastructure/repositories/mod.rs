pub mod audio_blob_repository;
pub mod openai_synthesis_repository;
pub mod polly_synthesis_repository;
pub mod synthesis_repository;
pub mod voiceover_cache_repository;

pub use audio_blob_repository::{AudioBlobRepository, FsAudioBlobRepository};
pub use openai_synthesis_repository::OpenAiSynthesisRepository;
pub use polly_synthesis_repository::PollySynthesisRepository;
pub use synthesis_repository::{SynthesisRepository, SynthesizedSpeech};
pub use voiceover_cache_repository::{PgVoiceoverCacheRepository, VoiceoverCacheRepository};
