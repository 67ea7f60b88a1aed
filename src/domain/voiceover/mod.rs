pub mod audio;
pub mod error;
pub mod model;
pub mod service;

pub use error::VoiceoverServiceError;
pub use model::{CachedVoiceover, TokenOffset, Voiceover};
pub use service::{generate_voiceover_filename, VoiceoverService, VoiceoverServiceApi};
