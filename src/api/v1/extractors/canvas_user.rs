use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::canvas::{CanvasUser, RejectReason};
use crate::state::AppState;

/// Handler で CanvasUser を受け取るための extractor
/// canvas middleware が request.extensions() に insert 済みである前提
/// 見つからない場合は 403 (gate が掛かっていないルート)
pub struct CanvasUserExtractor(pub CanvasUser);

impl FromRequestParts<AppState> for CanvasUserExtractor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CanvasUser>()
            .cloned()
            .map(CanvasUserExtractor)
            .ok_or(AppError::from(RejectReason::MissingField))
    }
}
