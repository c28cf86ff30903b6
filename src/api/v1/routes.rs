/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health は gate なし, /canvas/... は canvas gate (signed_request) の内側
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware;
use crate::state::AppState;

use crate::api::v1::handlers::{
    canvas::{index, me},
    health::health,
};

pub fn routes(state: AppState) -> Router<AppState> {
    let canvas = Router::new()
        .route("/canvas/", post(index))
        .route("/canvas/me", post(me));
    let canvas = middleware::canvas::apply(canvas, state);

    Router::new().route("/health", get(health)).merge(canvas)
}
