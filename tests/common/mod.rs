//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response};
use axum::Router;
use tempfile::TempDir;
use tokio_stream::StreamExt;
use tower::ServiceExt;

use dsplay::{HttpServer, ServerConfig, Shutdown};

pub const MARKER: &str = "datastar-request";

/// A throwaway playground directory.
pub struct Playground {
    pub dir: TempDir,
}

impl Playground {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn file(self, rel: &str, content: &str) -> Self {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.playground.root = self.root().to_path_buf();
        config.session.secret = "integration-test-secret".into();
        config.live.default_delay_ms = 50;
        config
    }

    pub fn router(&self) -> Router {
        router_with(self.config(), Shutdown::new())
    }
}

pub fn router_with(config: ServerConfig, shutdown: Shutdown) -> Router {
    HttpServer::new(config, shutdown).router()
}

/// Request builder with an optional session cookie and live marker.
pub struct Call {
    method: Method,
    uri: String,
    cookie: Option<String>,
    live: bool,
    body: String,
}

impl Call {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            cookie: None,
            live: false,
            body: String::new(),
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn cookie(mut self, cookie: Option<&str>) -> Self {
        self.cookie = cookie.map(str::to_string);
        self
    }

    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub async fn send(self, router: &Router) -> Response<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(COOKIE, cookie.as_str());
        }
        if self.live {
            builder = builder.header(MARKER, "true");
        }
        let request = builder.body(Body::from(self.body)).unwrap();
        router.clone().oneshot(request).await.unwrap()
    }
}

/// The `name=value` part of the response's session cookie.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Incremental reader over a streaming (SSE) response body.
pub struct EventReader {
    stream: axum::body::BodyDataStream,
    buffer: String,
}

impl EventReader {
    pub fn new(response: Response<Body>) -> Self {
        Self {
            stream: response.into_body().into_data_stream(),
            buffer: String::new(),
        }
    }

    /// Read until `needle` appears, returning everything read up to and
    /// including the event that contained it.
    pub async fn until(&mut self, needle: &str) -> String {
        let found = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(at) = self.buffer.find(needle) {
                    let end = self.buffer[at..]
                        .find("\n\n")
                        .map(|i| at + i + 2)
                        .unwrap_or(self.buffer.len());
                    let taken: String = self.buffer.drain(..end).collect();
                    return taken;
                }
                match self.stream.next().await {
                    Some(chunk) => {
                        let chunk = chunk.unwrap();
                        self.buffer.push_str(std::str::from_utf8(&chunk).unwrap());
                    }
                    None => panic!("stream ended before {needle:?}; got {:?}", self.buffer),
                }
            }
        })
        .await;
        found.unwrap_or_else(|_| panic!("timed out waiting for {needle:?}"))
    }

    /// Whether the stream has ended within `wait`.
    pub async fn ends_within(&mut self, wait: Duration) -> bool {
        let result = tokio::time::timeout(wait, async {
            while let Some(chunk) = self.stream.next().await {
                if let Ok(chunk) = chunk {
                    self.buffer.push_str(&String::from_utf8_lossy(&chunk));
                }
            }
        })
        .await;
        result.is_ok()
    }
}
