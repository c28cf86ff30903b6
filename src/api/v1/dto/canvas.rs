use serde::Serialize;
use serde_json::{Map, Value};

use crate::services::canvas::CanvasUser;

/// Response for `POST /canvas/`.
///
/// `oauth_token` is never echoed back to the browser.
#[derive(Debug, Serialize)]
pub struct CanvasUserResponse {
    pub app_id: String,
    pub user_id: Option<String>,
    pub payload: Map<String, Value>,
}

impl CanvasUserResponse {
    pub fn new(app_id: &str, user: &CanvasUser) -> Self {
        let mut payload = user.payload().as_map().clone();
        payload.remove("oauth_token");

        Self {
            app_id: app_id.to_string(),
            user_id: user.payload().user_id().map(str::to_string),
            payload,
        }
    }
}
