use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use clap::Parser;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Generate a canvas `signed_request` (HMAC-SHA256) for local testing.
///
/// Output is `base64url(sig).base64url(json)` without padding, where `sig` is
/// computed over the encoded JSON segment, exactly like the platform does.
///
/// Example:
///   curl -X POST http://localhost:3000/api/v1/canvas/ \
///     --data-urlencode "signed_request=$(signed-request-gen --secret s --oauth-token t --quiet)"
#[derive(Parser, Debug)]
#[command(name = "signed-request-gen", version, about)]
struct Args {
    /// App secret (CANVAS_CLIENT_SECRET)
    #[arg(long, env = "CANVAS_CLIENT_SECRET")]
    secret: String,

    /// JSON object file to use as the payload base. Default: `{}`.
    #[arg(long, value_name = "FILE")]
    payload: Option<PathBuf>,

    /// Set `user_id`
    #[arg(long)]
    user_id: Option<String>,

    /// Set `oauth_token`. Omit to simulate a user who has not authorized the app.
    #[arg(long)]
    oauth_token: Option<String>,

    /// Override issued_at (unix seconds). Default: now.
    #[arg(long)]
    issued_at: Option<u64>,

    /// Print only the signed_request (no extra lines)
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn now_unix() -> Result<u64, Box<dyn std::error::Error>> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

type Claims = serde_json::Map<String, serde_json::Value>;

fn load_payload(path: Option<&PathBuf>) -> Result<Claims, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(Claims::new());
    };

    let raw = fs::read_to_string(path)?;
    match serde_json::from_str::<serde_json::Value>(&raw)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err("payload file must contain a JSON object".into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut claims = load_payload(args.payload.as_ref())?;

    claims.insert("algorithm".to_string(), "HMAC-SHA256".into());
    let issued_at = match args.issued_at {
        Some(v) => v,
        None => now_unix()?,
    };
    claims.insert("issued_at".to_string(), issued_at.into());

    if let Some(user_id) = args.user_id.clone() {
        claims.insert("user_id".to_string(), user_id.into());
    }
    if let Some(token) = args.oauth_token.clone() {
        claims.insert("oauth_token".to_string(), token.into());
    }

    let payload = serde_json::Value::Object(claims);
    let encoded_payload = URL_SAFE_NO_PAD.encode(serde_json::to_string(&payload)?.as_bytes());

    let mut mac =
        Hmac::<Sha256>::new_from_slice(args.secret.as_bytes()).map_err(|e| e.to_string())?;
    mac.update(encoded_payload.as_bytes());
    let encoded_sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    let signed_request = format!("{}.{}", encoded_sig, encoded_payload);

    if args.quiet {
        println!("{}", signed_request);
        return Ok(());
    }

    println!("signed_request: {}", signed_request);
    println!("payload: {}", payload);
    if args.oauth_token.is_none() {
        println!("oauth_token: (none, gate will redirect to the dialog)");
    }

    Ok(())
}
