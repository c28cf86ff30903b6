/*
 * Responsibility
 * - canvas gate の内側の handler
 * - CanvasUser は extractor 経由で受け取る (middleware が検証済み)
 * - Graph API はユーザーの oauth_token で呼ぶ
 */
use axum::{Json, extract::State};
use serde_json::Value;

use crate::{
    api::v1::{dto::canvas::CanvasUserResponse, extractors::CanvasUserExtractor},
    error::AppError,
    state::AppState,
};

pub async fn index(
    State(state): State<AppState>,
    CanvasUserExtractor(user): CanvasUserExtractor,
) -> Json<CanvasUserResponse> {
    Json(CanvasUserResponse::new(&state.canvas.client_id, &user))
}

pub async fn me(
    State(state): State<AppState>,
    CanvasUserExtractor(user): CanvasUserExtractor,
) -> Result<Json<Value>, AppError> {
    // Proceed always carries a token.
    let token = user.oauth_token().ok_or(AppError::Forbidden {
        reason: "missing_token",
    })?;

    let me = state.graph.get("/me", token, &[]).await?;
    Ok(Json(me))
}
