//! Canvas gate: `signed_request` 検証 → 認可判定 → CanvasUser を extensions に入れる
//!
//! - Proceed: body を戻して次へ (handler は `CanvasUserExtractor` で受け取る)
//! - RedirectAuthorize: 200 + HTML (top window を認可ダイアログへ)
//! - Rejected: 403
//! - body が `HttpLimits::body_limit_bytes` を超える: 413

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
};

use crate::error::AppError;
use crate::services::canvas::{CanvasRequest, Disposition, Interceptor};
use crate::state::AppState;

/// Protect every route in `router` with the canvas gate.
///
/// ```ignore
/// let canvas = Router::new().route("/canvas/", post(index));
/// let canvas = middleware::canvas::apply(canvas, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, canvas_middleware))
}

async fn canvas_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = req.into_parts();

    let bytes = axum::body::to_bytes(body, state.limits.body_limit_bytes)
        .await
        .map_err(|err| {
            tracing::warn!(
                reason = "body_too_large",
                limit = state.limits.body_limit_bytes,
                error = %err,
                "failed to read canvas request body"
            );
            AppError::PayloadTooLarge
        })?;

    let canvas_req = if is_form(&parts.headers) {
        CanvasRequest::from_form(&bytes)
    } else {
        CanvasRequest::default()
    };

    match state.gatekeeper.intercept(&canvas_req).await {
        Disposition::Proceed(user) => {
            // Handlers may still want the form, so hand the body back.
            let mut req = Request::from_parts(parts, Body::from(bytes));
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Disposition::RedirectAuthorize(page) => Ok(Html(page).into_response()),
        Disposition::Rejected(reason) => Err(reason.into()),
    }
}

fn is_form(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}
