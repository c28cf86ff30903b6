//! Security-related response headers for a framed (canvas) app.
//!
//! Unlike a normal site we must stay embeddable: the platform renders us in
//! an iframe. So there is no `X-Frame-Options: DENY`; framing is restricted
//! with CSP `frame-ancestors` instead.

use axum::Router;
use axum::http::header::{HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

/// Apply common security headers to all responses.
///
/// `frame_ancestors` is a CSP source list, e.g. `https://apps.facebook.com`.
/// If it is not a valid header value we fall back to `'none'`.
pub fn apply(router: Router, frame_ancestors: &str) -> Router {
    let csp = HeaderValue::from_str(&format!("frame-ancestors {frame_ancestors}"))
        .unwrap_or_else(|_| {
            tracing::warn!("invalid frame-ancestors value, refusing all framing");
            HeaderValue::from_static("frame-ancestors 'none'")
        });

    router
        // Only the platform may frame us
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("content-security-policy"),
            csp,
        ))
        // Prevent MIME sniffing
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        // signed_request never travels in URLs, but the dialog redirect does carry ours
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
        ))
}
