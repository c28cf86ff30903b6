//! Per-request canvas gate.
//!
//! `Start -> Verifying -> Deciding -> {Proceed, RedirectAuthorize, Rejected}`
//!
//! This module is HTTP-agnostic: the axum middleware builds a `CanvasRequest`,
//! calls `intercept`, and maps the `Disposition` to a response.
use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::CanvasConfig;
use crate::services::canvas::decision::{self, Decision};
use crate::services::canvas::dialog;
use crate::services::canvas::signed_request::{self, PayloadBody};
use crate::services::graph::PermissionFetcher;

/// Form field the platform POSTs on every canvas load.
pub const SIGNED_REQUEST_FIELD: &str = "signed_request";

/// What the gate needs to know about an inbound request.
#[derive(Debug, Clone, Default)]
pub struct CanvasRequest {
    pub signed_request: Option<String>,
}

impl CanvasRequest {
    /// Read `signed_request` from an `application/x-www-form-urlencoded` body.
    pub fn from_form(body: &[u8]) -> Self {
        let signed_request = url::form_urlencoded::parse(body)
            .find(|(k, _)| k == SIGNED_REQUEST_FIELD)
            .map(|(_, v)| v.into_owned());

        Self { signed_request }
    }
}

/// Verified canvas user, available to handlers for the rest of the request.
#[derive(Debug, Clone)]
pub struct CanvasUser(pub PayloadBody);

impl CanvasUser {
    pub fn payload(&self) -> &PayloadBody {
        &self.0
    }

    pub fn oauth_token(&self) -> Option<&str> {
        self.0.oauth_token()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingField,
    VerificationFailed,
    UpstreamError,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::VerificationFailed => "verification_failed",
            Self::UpstreamError => "upstream_error",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Disposition {
    Proceed(CanvasUser),
    /// HTML page that sends the top window to the authorization dialog.
    RedirectAuthorize(String),
    Rejected(RejectReason),
}

/// Request interceptor registered by the web framework in front of protected routes.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, request: &CanvasRequest) -> Disposition;
}

/// Verifies `signed_request` and decides the request's disposition.
///
/// Holds only read-only state; one instance serves all concurrent requests.
#[derive(Clone)]
pub struct Gatekeeper {
    config: Arc<CanvasConfig>,
    required_scope: BTreeSet<String>,
    fetcher: Arc<dyn PermissionFetcher>,
}

impl std::fmt::Debug for Gatekeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gatekeeper")
            .field("config", &self.config)
            .field("required_scope", &self.required_scope)
            .finish()
    }
}

impl Gatekeeper {
    pub fn new(config: Arc<CanvasConfig>, fetcher: Arc<dyn PermissionFetcher>) -> Self {
        let required_scope = config.required_scope();
        Self {
            config,
            required_scope,
            fetcher,
        }
    }

    fn redirect(&self) -> Disposition {
        let url = dialog::authorize_url(&self.config);
        Disposition::RedirectAuthorize(dialog::authorize_page(&url))
    }
}

#[async_trait]
impl Interceptor for Gatekeeper {
    async fn intercept(&self, request: &CanvasRequest) -> Disposition {
        // Start
        let Some(raw) = request.signed_request.as_deref() else {
            tracing::warn!(
                reason = RejectReason::MissingField.as_str(),
                "signed_request not in request form"
            );
            return Disposition::Rejected(RejectReason::MissingField);
        };

        // Verifying
        let body = match signed_request::verify(raw, self.config.secret_bytes()) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(
                    reason = RejectReason::VerificationFailed.as_str(),
                    error = %err,
                    "signed_request verification failed"
                );
                return Disposition::Rejected(RejectReason::VerificationFailed);
            }
        };

        // Deciding
        let outcome = decision::decide(
            body,
            &self.required_scope,
            self.config.skip_auth_check,
            self.fetcher.as_ref(),
        )
        .await;

        match outcome {
            Ok(Decision::Authorized(body)) => {
                tracing::info!(
                    user_id = body.user_id().unwrap_or("-"),
                    "all required permissions have been granted"
                );
                Disposition::Proceed(CanvasUser(body))
            }
            Ok(Decision::NeedsAuthorization) => {
                tracing::info!("user not authorized, redirecting to dialog");
                self.redirect()
            }
            Err(err) => {
                tracing::warn!(
                    reason = RejectReason::UpstreamError.as_str(),
                    error = %err,
                    "permission lookup failed"
                );
                Disposition::Rejected(RejectReason::UpstreamError)
            }
        }
    }
}
