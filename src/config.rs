/*
 * Responsibility
 * - 環境変数や設定の読み込み (CANVAS_CLIENT_ID / CANVAS_CLIENT_SECRET / CANVAS_SCOPE など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::AppError;
use crate::services::canvas::decision;

const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com";
const DEFAULT_DIALOG_URL: &str = "https://www.facebook.com/dialog/oauth/";
const DEFAULT_FRAME_ANCESTORS: &str = "https://apps.facebook.com https://*.facebook.com";
const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        tracing::error!(error = %e, "configuration error");
        AppError::Internal
    }
}

/// Per-deployment canvas settings. Read-only after startup.
///
/// - `client_secret` is not printable via Debug.
#[derive(Clone)]
pub struct CanvasConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    // Sent to the dialog byte-for-byte; the platform compares it exactly.
    pub redirect_uri: String,
    // Comma-separated permission names, as sent to the dialog.
    pub scope: String,
    pub skip_auth_check: bool,

    pub graph_base_url: Url,
    pub graph_timeout: Duration,
    pub dialog_url: Url,
}

impl fmt::Debug for CanvasConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasConfig")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("skip_auth_check", &self.skip_auth_check)
            .field("graph_base_url", &self.graph_base_url.as_str())
            .field("graph_timeout", &self.graph_timeout)
            .field("dialog_url", &self.dialog_url.as_str())
            .finish()
    }
}

impl CanvasConfig {
    pub fn secret_bytes(&self) -> &[u8] {
        self.client_secret.expose_secret().as_bytes()
    }

    pub fn required_scope(&self) -> BTreeSet<String> {
        decision::required_scope(&self.scope)
    }

    #[cfg(test)]
    pub fn for_tests(client_id: &str, secret: &str, redirect_uri: &str, scope: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: SecretString::from(secret.to_string()),
            redirect_uri: redirect_uri.to_string(),
            scope: scope.to_string(),
            skip_auth_check: false,
            graph_base_url: Url::parse(DEFAULT_GRAPH_BASE_URL).expect("default graph url"),
            graph_timeout: Duration::from_secs(10),
            dialog_url: Url::parse(DEFAULT_DIALOG_URL).expect("default dialog url"),
        }
    }
}

/// Global HTTP limits applied by `middleware::http`.
#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    pub body_limit_bytes: usize,
    pub request_timeout: Duration,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub http: HttpLimits,

    // CSP frame-ancestors source list (who may embed us)
    pub frame_ancestors: String,

    pub canvas: CanvasConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let body_limit_bytes = std::env::var("REQUEST_BODY_LIMIT_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_BODY_LIMIT_BYTES);

        let request_timeout_seconds = std::env::var("REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS);

        let frame_ancestors = std::env::var("CANVAS_FRAME_ANCESTORS")
            .unwrap_or_else(|_| DEFAULT_FRAME_ANCESTORS.to_string());

        let canvas = canvas_from_env()?;

        Ok(Self {
            addr,
            app_env,
            http: HttpLimits {
                body_limit_bytes,
                request_timeout: Duration::from_secs(request_timeout_seconds),
            },
            frame_ancestors,
            canvas,
        })
    }
}

fn canvas_from_env() -> Result<CanvasConfig, ConfigError> {
    let client_id = std::env::var("CANVAS_CLIENT_ID")
        .map_err(|_| ConfigError::Missing("CANVAS_CLIENT_ID"))?;

    let client_secret = std::env::var("CANVAS_CLIENT_SECRET")
        .map(SecretString::from)
        .map_err(|_| ConfigError::Missing("CANVAS_CLIENT_SECRET"))?;

    let redirect_uri = std::env::var("CANVAS_REDIRECT_URI")
        .map_err(|_| ConfigError::Missing("CANVAS_REDIRECT_URI"))?;
    // Validate only; the configured string is what goes on the wire.
    Url::parse(&redirect_uri).map_err(|_| ConfigError::Invalid("CANVAS_REDIRECT_URI"))?;

    let scope = std::env::var("CANVAS_SCOPE").unwrap_or_default();

    let skip_auth_check = match std::env::var("CANVAS_SKIP_AUTH_CHECK") {
        Ok(v) => parse_bool(&v).ok_or(ConfigError::Invalid("CANVAS_SKIP_AUTH_CHECK"))?,
        Err(_) => false,
    };

    let graph_base_url = url_var("CANVAS_GRAPH_BASE_URL", DEFAULT_GRAPH_BASE_URL)?;
    let dialog_url = url_var("CANVAS_DIALOG_URL", DEFAULT_DIALOG_URL)?;

    let graph_timeout_seconds = match std::env::var("CANVAS_GRAPH_TIMEOUT_SECONDS") {
        Ok(v) => v
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ConfigError::Invalid("CANVAS_GRAPH_TIMEOUT_SECONDS"))?,
        Err(_) => 10,
    };

    Ok(CanvasConfig {
        client_id,
        client_secret,
        redirect_uri,
        scope,
        skip_auth_check,
        graph_base_url,
        graph_timeout: Duration::from_secs(graph_timeout_seconds),
        dialog_url,
    })
}

fn url_var(key: &'static str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|_| ConfigError::Invalid(key))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
