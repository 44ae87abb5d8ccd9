use super::types::{ErrorResponse, PromptRequest, PromptResponse};
use crate::llm::{ChatClient, ChatMessage};
use axum::{extract::State, http::StatusCode, response::Json};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<dyn ChatClient>,
}

pub async fn get_response(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.prompt.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Prompt is required".to_string(),
            }),
        ));
    }

    info!("Received prompt of {} bytes", request.prompt.len());

    match state.chat.chat(vec![ChatMessage::user(request.prompt)]).await {
        Ok(reply) => Ok(Json(PromptResponse { response: reply })),
        Err(e) => {
            error!("Model request failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Model request failed: {}", e),
                }),
            ))
        }
    }
}
