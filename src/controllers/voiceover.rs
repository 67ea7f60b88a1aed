use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    domain::voiceover::{TokenOffset, Voiceover, VoiceoverService, VoiceoverServiceApi},
    error::{AppError, AppResult},
};

/// Request for POST /api/voiceovers/regenerate
#[derive(Debug, Serialize, Deserialize)]
pub struct RegenerateVoiceoverRequest {
    pub content_id: String,
    pub markup: String,
    pub language_accent_code: String,
}

/// Response for POST /api/voiceovers/regenerate
#[derive(Debug, Serialize, Deserialize)]
pub struct RegenerateVoiceoverResponse {
    pub voiceover: Voiceover,
    pub token_offsets: Vec<TokenOffset>,
}

pub struct VoiceoverController {
    voiceover_service: Arc<VoiceoverService>,
}

impl VoiceoverController {
    pub fn new(voiceover_service: Arc<VoiceoverService>) -> Self {
        Self { voiceover_service }
    }

    /// POST /api/voiceovers/regenerate - Regenerate the voiceover for a
    /// piece of lesson content
    pub async fn regenerate(
        State(controller): State<Arc<VoiceoverController>>,
        Json(request): Json<RegenerateVoiceoverRequest>,
    ) -> AppResult<(StatusCode, Json<RegenerateVoiceoverResponse>)> {
        // Validate input
        if request.content_id.trim().is_empty() {
            return Err(AppError::BadRequest(
                "content_id cannot be empty".to_string(),
            ));
        }
        if request.language_accent_code.trim().is_empty() {
            return Err(AppError::BadRequest(
                "language_accent_code cannot be empty".to_string(),
            ));
        }
        if request.markup.is_empty() {
            return Err(AppError::BadRequest("markup cannot be empty".to_string()));
        }
        if request.markup.len() > 50_000 {
            return Err(AppError::PayloadTooLarge(
                "Markup must be 50,000 characters or less".to_string(),
            ));
        }

        let (voiceover, token_offsets) = controller
            .voiceover_service
            .regenerate_voiceover(
                &request.content_id,
                &request.markup,
                &request.language_accent_code,
            )
            .await
            .map_err(AppError::from)?;

        Ok((
            StatusCode::CREATED,
            Json(RegenerateVoiceoverResponse {
                voiceover,
                token_offsets,
            }),
        ))
    }
}
