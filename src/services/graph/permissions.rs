//! Granted-permission lookup (`/me/permissions`).
use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;

use crate::services::graph::client::{GraphClient, RemoteError};

/// Permission names the user has granted to this app.
pub type PermissionSet = BTreeSet<String>;

/// Source of a user's granted permissions.
///
/// The decider only depends on this trait, so tests can plug in fixed answers.
#[async_trait]
pub trait PermissionFetcher: Send + Sync {
    async fn fetch_granted_permissions(&self, oauth_token: &str)
    -> Result<PermissionSet, RemoteError>;
}

#[async_trait]
impl PermissionFetcher for GraphClient {
    async fn fetch_granted_permissions(
        &self,
        oauth_token: &str,
    ) -> Result<PermissionSet, RemoteError> {
        let value = self.get("/me/permissions", oauth_token, &[]).await?;
        parse_permissions(&value)
    }
}

/// Extract the permission set from a `{"data": [{...}]}` response.
///
/// The field names of the first record are the granted permissions.
pub fn parse_permissions(value: &Value) -> Result<PermissionSet, RemoteError> {
    let data = match value.get("data") {
        None | Some(Value::Null) => return Err(RemoteError::EmptyResponse),
        Some(Value::Array(data)) => data,
        Some(_) => return Err(RemoteError::Decode("'data' is not an array".into())),
    };

    let first = data.first().ok_or(RemoteError::EmptyResponse)?;
    let record = first
        .as_object()
        .ok_or_else(|| RemoteError::Decode("permission record is not an object".into()))?;

    Ok(record.keys().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::get};
    use serde_json::json;
    use std::time::Duration;
    use url::Url;

    #[test]
    fn first_record_keys_are_the_permission_set() {
        let value = json!({
            "data": [
                { "installed": 1, "email": 1, "public_profile": 1 },
                { "ignored": 1 }
            ]
        });

        let perms = parse_permissions(&value).unwrap();

        let expected: PermissionSet = ["email", "installed", "public_profile"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(perms, expected);
    }

    #[test]
    fn missing_or_empty_data_is_empty_response() {
        assert_eq!(
            parse_permissions(&json!({})),
            Err(RemoteError::EmptyResponse)
        );
        assert_eq!(
            parse_permissions(&json!({ "data": null })),
            Err(RemoteError::EmptyResponse)
        );
        assert_eq!(
            parse_permissions(&json!({ "data": [] })),
            Err(RemoteError::EmptyResponse)
        );
    }

    #[test]
    fn unexpected_shapes_are_decode_errors() {
        assert!(matches!(
            parse_permissions(&json!({ "data": "email" })),
            Err(RemoteError::Decode(_))
        ));
        assert!(matches!(
            parse_permissions(&json!({ "data": ["email"] })),
            Err(RemoteError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn graph_client_fetches_me_permissions() {
        let router = Router::new().route(
            "/me/permissions",
            get(|| async { Json(json!({ "data": [{ "email": 1 }] })) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let base = Url::parse(&format!("http://{addr}")).unwrap();
        let client = GraphClient::new(&base, Duration::from_secs(5)).unwrap();

        let perms = client.fetch_granted_permissions("tok").await.unwrap();

        assert!(perms.contains("email"));
        assert_eq!(perms.len(), 1);
    }
}
