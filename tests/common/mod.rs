#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use imglet::app::crawler::CrawlerDetector;
use imglet::http;
use imglet::infra::memory::MemoryImageStore;
use imglet::infra::storage::InlineStorage;
use imglet::AppState;

pub const BASE_URL: &str = "https://pics.test";
pub const UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// Full router over the in-memory store and inline storage backend, so the
/// suite runs with no external infrastructure.
pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState {
            store: Arc::new(MemoryImageStore::new()),
            storage: Arc::new(InlineStorage::new()),
            crawlers: CrawlerDetector::default(),
            base_url: BASE_URL.to_string(),
            upload_max_bytes: UPLOAD_MAX_BYTES,
        };
        Self {
            router: http::router(state),
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.get_with_ua(path, None).await
    }

    pub async fn get_with_ua(&self, path: &str, user_agent: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(ua) = user_agent {
            builder = builder.header(header::USER_AGENT, ua);
        }
        self.send(builder.body(Body::empty()).expect("build request"))
            .await
    }

    /// Multipart upload with a single field named `file`.
    pub async fn upload(&self, file_name: &str, content_type: &str, data: &[u8]) -> TestResponse {
        self.post_multipart_field("file", file_name, content_type, data)
            .await
    }

    pub async fn post_multipart_field(
        &self,
        field: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> TestResponse {
        let body = multipart_body(field, file_name, content_type, data);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .expect("build request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }
}

fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).to_string()
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }

    pub fn header(&self, name: &str) -> String {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    }
}
