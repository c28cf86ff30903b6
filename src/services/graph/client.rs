//! Graph API client.
//!
//! Only one primitive is provided: an authenticated GET that returns parsed
//! JSON. Anything richer belongs to application code built on top of it.
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Errors from a Graph API call.
///
/// No retries happen here; callers decide how to surface these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("graph transport error: {0}")]
    Transport(String),
    #[error("graph decode error: {0}")]
    Decode(String),
    #[error("graph returned an empty result")]
    EmptyResponse,
}

/// Thin wrapper around a shared `reqwest::Client`.
///
/// The client carries a request timeout so a stalled upstream cannot hang
/// the serving task.
#[derive(Clone, Debug)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// `GET {base}{path}?access_token={token}[&{params}]` and parse the body as JSON.
    ///
    /// - non-2xx status => `Transport`
    /// - body is not JSON => `Decode`
    pub async fn get(
        &self,
        path: &str,
        access_token: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, RemoteError> {
        let url = self.build_url(path, access_token, params)?;

        // `without_url` keeps the access token out of error messages (and logs).
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.without_url().to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(RemoteError::Transport(format!(
                "unexpected status {status}"
            )));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| RemoteError::Transport(e.without_url().to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn build_url(
        &self,
        path: &str,
        access_token: &str,
        params: &[(&str, &str)],
    ) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| RemoteError::Transport(format!("invalid graph url: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("access_token", access_token);
            for (k, v) in params {
                query.append_pair(k, v);
            }
        }

        Ok(url)
    }
}
