//! Responses built locally when neither the network nor the cache can answer.

use reqwest::{StatusCode, Url};

use crate::fetch::FetchResponse;

/// Heading shown on the offline page. Clients look for it to detect the
/// fallback.
pub const OFFLINE_MARKER: &str = "You're Offline";

const OFFLINE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Offline</title>
    <style>
        body {
            font-family: system-ui, sans-serif;
            margin: 0;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            text-align: center;
            padding: 1rem;
        }
        .container { max-width: 400px; padding: 2rem; border-radius: 12px; box-shadow: 0 4px 12px rgba(0,0,0,0.1); }
        p { color: #6b7280; line-height: 1.5; }
        button { padding: 0.75rem 1.5rem; border: none; border-radius: 0.5rem; font-weight: 600; cursor: pointer; }
    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>
        <h2>{marker}</h2>
        <p>Your connection appears to be down. Everything will be back once you are online again.</p>
        <button onclick="location.reload()">Try Again</button>
    </div>
</body>
</html>
"#;

/// The offline page served for navigations with nothing cached.
///
/// Served with 200 so the browser renders it as the page.
pub fn offline_page(url: &Url, title: &str) -> FetchResponse {
    let html = OFFLINE_HTML
        .replace("{title}", &escape(title))
        .replace("{marker}", OFFLINE_MARKER);
    FetchResponse::synthesized(url, StatusCode::OK, "text/html; charset=utf-8", html)
}

/// A plain-text 503.
pub fn unavailable(url: &Url, message: &'static str) -> FetchResponse {
    FetchResponse::synthesized(url, StatusCode::SERVICE_UNAVAILABLE, "text/plain; charset=utf-8", message)
}

fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
