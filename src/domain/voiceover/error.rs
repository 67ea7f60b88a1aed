use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum VoiceoverServiceError {
    #[error("synthesis failed: {0}")]
    Synthesis(String),
    #[error("audio storage error: {0}")]
    Storage(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<VoiceoverServiceError> for AppError {
    fn from(err: VoiceoverServiceError) -> Self {
        match err {
            VoiceoverServiceError::Synthesis(msg) => AppError::ExternalService(msg),
            VoiceoverServiceError::Storage(msg) => AppError::Storage(msg),
            VoiceoverServiceError::Invalid(msg) => AppError::BadRequest(msg),
            VoiceoverServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
