//! HTTP client for the external backend API.
//!
//! Every proxy handler goes through [`BackendClient`], which applies the
//! configured base URL and timeout, attaches caller credentials and decodes
//! the JSON body. No retries: a failed call is reported once and the caller
//! decides between surfacing the error and falling back to local storage.

use std::time::{Duration, Instant};

use reqwest::{header::AUTHORIZATION, multipart::Form, Method};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{metrics, CoreError};

/// Status and decoded JSON body of an upstream reply.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: u16,
    pub body: Value,
}

impl BackendResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Upstream payload with one level of `{ data: ... }` wrapping removed.
    pub fn data(&self) -> &Value {
        self.body.get("data").unwrap_or(&self.body)
    }

    /// Best-effort human readable message from the upstream body.
    pub fn message(&self) -> Option<String> {
        ["message", "error", "detail"]
            .iter()
            .find_map(|k| self.body.get(*k).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| self.body.as_str().map(str::to_string))
    }
}

/// One outbound call, built up by a handler before sending.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    authorization: Option<String>,
}

impl BackendRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None, authorization: None }
    }

    pub fn get(path: impl Into<String>) -> Self { Self::new(Method::GET, path) }
    pub fn post(path: impl Into<String>) -> Self { Self::new(Method::POST, path) }
    pub fn put(path: impl Into<String>) -> Self { Self::new(Method::PUT, path) }
    pub fn delete(path: impl Into<String>) -> Self { Self::new(Method::DELETE, path) }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Forward the caller's `Authorization` header value verbatim.
    pub fn authorization(mut self, value: Option<&str>) -> Self {
        self.authorization = value.map(str::to_string);
        self
    }
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CoreError::Network(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), timeout_secs })
    }

    /// Absolute upstream URL for a backend-relative path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn send(&self, req: BackendRequest) -> Result<BackendResponse, CoreError> {
        let url = self.url(&req.path);
        let mut builder = self.http.request(req.method.clone(), &url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(auth) = &req.authorization {
            builder = builder.header(AUTHORIZATION, auth);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        self.execute(builder, req.method.as_str(), &url).await
    }

    /// Post a multipart form to an absolute URL (image host or backend upload route).
    pub async fn send_multipart(&self, url: &str, form: Form, authorization: Option<&str>) -> Result<BackendResponse, CoreError> {
        let mut builder = self.http.post(url).multipart(form);
        if let Some(auth) = authorization {
            builder = builder.header(AUTHORIZATION, auth);
        }
        self.execute(builder, "POST", url).await
    }

    async fn execute(&self, builder: reqwest::RequestBuilder, method: &str, url: &str) -> Result<BackendResponse, CoreError> {
        metrics::UPSTREAM_REQUESTS_TOTAL.inc();
        let started = Instant::now();
        let resp = builder.send().await.map_err(|e| {
            metrics::UPSTREAM_FAILURES_TOTAL.inc();
            warn!(event = "upstream_unreachable", %method, %url, error = %e, "backend request failed");
            if e.is_timeout() {
                CoreError::Timeout(self.timeout_secs)
            } else {
                CoreError::Network(e.to_string())
            }
        })?;

        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| CoreError::Network(e.to_string()))?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(v) => v,
                Err(e) if (200..300).contains(&status) => return Err(CoreError::Parse(e.to_string())),
                Err(_) => Value::String(text),
            }
        };
        if !(200..300).contains(&status) {
            metrics::UPSTREAM_FAILURES_TOTAL.inc();
        }
        debug!(event = "upstream_response", %method, %url, status, elapsed_ms = started.elapsed().as_millis() as u64, "backend responded");
        Ok(BackendResponse { status, body })
    }
}
