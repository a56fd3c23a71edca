//! HTTP server
//!
//! - `GET /` - HTML page with a player for every catalog video
//! - `GET /videos` - catalog as JSON
//! - `GET /stream/:filename` - range-request video streaming
//!
//! Handlers only read the catalog and the filesystem. They share no lock
//! with generation; atomic publishing is the only coordination.

mod range;
mod stream;

pub use range::{parse_range_header, ByteRange, Unsatisfiable};
pub use stream::{open_video, stream_video, StreamError};

use axum::{
    extract::State,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use crate::catalog::Catalog;
use crate::error::{Result, TimelapseError};

/// Shared state for handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
}

/// Build the router over a catalog
pub fn router(catalog: Arc<Catalog>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/videos", get(list_videos))
        .route("/stream/:filename", get(stream_video))
        .with_state(AppState { catalog })
}

/// Bind the listening socket
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| TimelapseError::server(format!("Failed to bind {}: {}", addr, e)))
}

/// Serve `router` on `listener` until `shutdown` fires
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Video server listening on http://{}", addr);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            info!("Video server shutting down");
        })
        .await
        .map_err(|e| TimelapseError::server(format!("HTTP server stopped: {}", e)))
}

/// Catalog listing as JSON
async fn list_videos(State(state): State<AppState>) -> impl IntoResponse {
    let videos: Vec<_> = state
        .catalog
        .entries()
        .map(|entry| {
            serde_json::json!({
                "filename": entry.filename,
                "group": entry.group.name,
                "title": entry.group.display_title(),
                "fps": entry.fps,
                "url": format!("/stream/{}", entry.filename),
            })
        })
        .collect();

    Json(serde_json::json!({ "videos": videos }))
}

/// HTML page with one player per video, grouped by capture group
async fn index_page(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.catalog))
}

fn render_index(catalog: &Catalog) -> String {
    let mut body = String::new();
    let mut current_group: Option<&str> = None;

    for entry in catalog.entries() {
        if current_group != Some(entry.group.name.as_str()) {
            if current_group.is_some() {
                body.push_str("</section>\n");
            }
            current_group = Some(entry.group.name.as_str());
            let _ = writeln!(
                body,
                "<section>\n<h2>{}</h2>",
                escape_html(entry.group.display_title())
            );
        }

        let _ = writeln!(
            body,
            "<figure><video controls preload=\"metadata\" src=\"/stream/{file}\"></video>\
             <figcaption>{fps} fps &middot; <a href=\"/stream/{file}\">{file}</a></figcaption></figure>",
            file = entry.filename,
            fps = entry.fps,
        );
    }
    if current_group.is_some() {
        body.push_str("</section>\n");
    }

    INDEX_HTML.replace("{{videos}}", &body)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Timelapse Videos</title>
    <style>
        body {
            margin: 0;
            padding: 20px;
            background: #1a1a1a;
            color: #fff;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        }
        h2 { color: #7c3aed; }
        figure { display: inline-block; margin: 0 20px 20px 0; }
        video { width: 480px; max-width: 100%; background: #000; border-radius: 8px; }
        a { color: #a78bfa; }
    </style>
</head>
<body>
{{videos}}
</body>
</html>
"#;
