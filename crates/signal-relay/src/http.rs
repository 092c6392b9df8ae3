//! Plain HTTP side channel: health checks, stats, and static client files

use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use signal_core::path::{real_path_within, resolve_public_path};

use crate::hub::RelayHub;

/// A response ready to be written to the socket
#[derive(Debug)]
pub struct HttpResponse {
    pub status: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl HttpResponse {
    fn json(status: &'static str, body: String) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.into_bytes(),
        }
    }

    fn not_found() -> Self {
        Self::json("404 Not Found", r#"{"error":"not found"}"#.to_string())
    }

    /// Serialize the status line, headers, and body
    pub fn to_bytes(&self, include_body: bool) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            self.content_type,
            self.body.len()
        )
        .into_bytes();
        if include_body {
            out.extend_from_slice(&self.body);
        }
        out
    }
}

/// Answer a single HTTP request and close the connection
pub async fn handle_http_request(
    stream: &mut TcpStream,
    hub: &RelayHub,
    public_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let mut request_line = request
        .lines()
        .next()
        .unwrap_or_default()
        .split_whitespace();
    let method = request_line.next().unwrap_or("GET");
    let target = request_line.next().unwrap_or("/");

    debug!("HTTP {} {}", method, target);

    let response = route(method, target, hub, public_dir).await;
    stream
        .write_all(&response.to_bytes(method != "HEAD"))
        .await?;
    stream.shutdown().await?;
    Ok(())
}

/// Map a request onto a response
pub async fn route(
    method: &str,
    target: &str,
    hub: &RelayHub,
    public_dir: Option<&Path>,
) -> HttpResponse {
    if method != "GET" && method != "HEAD" {
        return HttpResponse::json(
            "405 Method Not Allowed",
            r#"{"error":"method not allowed"}"#.to_string(),
        );
    }

    match target {
        "/health" => HttpResponse::json(
            "200 OK",
            format!(
                r#"{{"status":"healthy","connections":{}}}"#,
                hub.connection_count()
            ),
        ),
        "/stats" => match serde_json::to_string(&hub.stats()) {
            Ok(body) => HttpResponse::json("200 OK", body),
            Err(e) => HttpResponse::json(
                "500 Internal Server Error",
                format!(r#"{{"error":"{}"}}"#, e),
            ),
        },
        _ => match public_dir {
            Some(dir) => serve_static(dir, target).await,
            None => HttpResponse::not_found(),
        },
    }
}

async fn serve_static(dir: &Path, target: &str) -> HttpResponse {
    let forbidden = || HttpResponse::json("403 Forbidden", r#"{"error":"forbidden"}"#.to_string());

    let path = match resolve_public_path(dir, target) {
        Ok(p) => p,
        Err(e) => {
            debug!("Refused static path {}: {}", target, e);
            return forbidden();
        }
    };

    if !path.is_file() {
        return HttpResponse::not_found();
    }

    let path = match real_path_within(dir, &path) {
        Ok(p) => p,
        Err(e) => {
            debug!("Refused static path {}: {}", target, e);
            return forbidden();
        }
    };

    match tokio::fs::read(&path).await {
        Ok(body) => HttpResponse {
            status: "200 OK",
            content_type: mime_type(&path.to_string_lossy()),
            body,
        },
        Err(_) => HttpResponse::not_found(),
    }
}

/// MIME type from filename extension
pub fn mime_type(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "map" => "application/json",
        "wasm" => "application/wasm",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webm" => "video/webm",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(resp: &HttpResponse) -> String {
        String::from_utf8(resp.body.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let hub = RelayHub::new();
        let _peer = hub.on_connect();

        let resp = route("GET", "/health", &hub, None).await;
        assert_eq!(resp.status, "200 OK");
        assert_eq!(body(&resp), r#"{"status":"healthy","connections":1}"#);
    }

    #[tokio::test]
    async fn test_stats() {
        let hub = RelayHub::new();
        let resp = route("GET", "/stats", &hub, None).await;
        assert_eq!(resp.status, "200 OK");

        let stats: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(stats["connections"], 0);
        assert_eq!(stats["messages_forwarded"], 0);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let hub = RelayHub::new();
        let resp = route("POST", "/health", &hub, None).await;
        assert_eq!(resp.status, "405 Method Not Allowed");
    }

    #[tokio::test]
    async fn test_no_public_dir() {
        let hub = RelayHub::new();
        let resp = route("GET", "/index.html", &hub, None).await;
        assert_eq!(resp.status, "404 Not Found");
    }

    #[tokio::test]
    async fn test_static_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>relay</h1>").unwrap();
        std::fs::create_dir(dir.path().join("js")).unwrap();
        std::fs::write(dir.path().join("js").join("client.js"), "connect();").unwrap();

        let hub = RelayHub::new();

        let resp = route("GET", "/", &hub, Some(dir.path())).await;
        assert_eq!(resp.status, "200 OK");
        assert_eq!(resp.content_type, "text/html; charset=utf-8");
        assert_eq!(body(&resp), "<h1>relay</h1>");

        let resp = route("GET", "/js/client.js?v=1", &hub, Some(dir.path())).await;
        assert_eq!(resp.content_type, "text/javascript; charset=utf-8");
        assert_eq!(body(&resp), "connect();");

        let resp = route("GET", "/missing.css", &hub, Some(dir.path())).await;
        assert_eq!(resp.status, "404 Not Found");

        let resp = route("GET", "/../etc/passwd", &hub, Some(dir.path())).await;
        assert_eq!(resp.status, "403 Forbidden");
    }

    #[test]
    fn test_head_omits_body() {
        let resp = HttpResponse::json("200 OK", "{}".to_string());
        let head = String::from_utf8(resp.to_bytes(false)).unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Length: 2\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type("app.WASM"), "application/wasm");
        assert_eq!(mime_type("README"), "application/octet-stream");
    }
}
