//! Authorization dialog redirect page.
//!
//! The app is rendered inside the platform's iframe, so a plain 302 would only
//! navigate the frame. Instead we return a tiny HTML page that moves the top
//! window to the dialog.
use url::Url;

use crate::config::CanvasConfig;

/// Dialog URL carrying `client_id`, `redirect_uri` and `scope` (percent-encoded).
pub fn authorize_url(config: &CanvasConfig) -> Url {
    let mut url = config.dialog_url.clone();
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", &config.scope);
    url
}

/// HTML document that sends the browser's top window to `url`.
pub fn authorize_page(url: &Url) -> String {
    // A JSON string is a valid JS string literal; `</` is escaped so the value
    // cannot close the script element.
    let target = serde_json::Value::String(url.to_string())
        .to_string()
        .replace("</", "<\\/");

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <script>window.top.location = {target};</script>\n\
         </head>\n\
         </html>\n"
    )
}
