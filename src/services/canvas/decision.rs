//! Authorization-state decision for a verified canvas payload.
use std::collections::BTreeSet;

use crate::services::canvas::signed_request::PayloadBody;
use crate::services::graph::{PermissionFetcher, RemoteError};

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Authorized(PayloadBody),
    NeedsAuthorization,
}

/// Split a comma-separated scope string into the required permission set.
///
/// Blank entries are ignored, so an empty scope requires nothing.
pub fn required_scope(scope: &str) -> BTreeSet<String> {
    scope
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decide whether `body` represents a fully authorized session.
///
/// Remote failures are returned as `Err`, never folded into
/// `NeedsAuthorization`: a user behind a Graph outage must not be sent
/// around the authorization dialog again.
pub async fn decide(
    body: PayloadBody,
    required: &BTreeSet<String>,
    skip_check: bool,
    fetcher: &dyn PermissionFetcher,
) -> Result<Decision, RemoteError> {
    let Some(token) = body.oauth_token() else {
        return Ok(Decision::NeedsAuthorization);
    };

    if skip_check {
        return Ok(Decision::Authorized(body));
    }

    let granted = fetcher.fetch_granted_permissions(token).await?;

    if required.is_subset(&granted) {
        Ok(Decision::Authorized(body))
    } else {
        let missing: Vec<&str> = required.difference(&granted).map(String::as_str).collect();
        tracing::debug!(?missing, "required permissions not granted");
        Ok(Decision::NeedsAuthorization)
    }
}
