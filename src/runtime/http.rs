/// HTTP collaborator for httpRequest nodes
///
/// Request/response contract: headers and body arrive as JSON text, and every
/// failure (parse, network, timeout, non-2xx) comes back as an unsuccessful
/// `HttpOutcome` rather than an error, so a request can never abort a run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{str::FromStr, time::Duration};

/// Default request timeout
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Methods an httpRequest node may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Whether a request body is sent for this method
    pub fn carries_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "" | "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            other => Err(format!("Unsupported HTTP method: {}", other)),
        }
    }
}

/// Request as configured on an httpRequest node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequestSpec {
    pub url: String,
    pub method: String,
    /// JSON object text, empty for none
    pub headers: String,
    /// JSON text, empty for none
    pub body: String,
}

/// Failure details recorded as a node's `lastError`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpFailure {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl HttpFailure {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            data: None,
        }
    }
}

/// Result of one request: `{success, data?, status?, error?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HttpFailure>,
}

impl HttpOutcome {
    pub fn ok(status: u16, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            status: Some(status),
            error: None,
        }
    }

    pub fn failed(error: HttpFailure) -> Self {
        Self {
            success: false,
            data: None,
            status: None,
            error: Some(error),
        }
    }
}

/// External HTTP collaborator
///
/// Implementations must resolve every failure into an unsuccessful outcome
/// and must not block past their timeout.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn perform_request(&self, request: &HttpRequestSpec) -> HttpOutcome;
}

/// Parse header JSON text into name/value pairs
///
/// Empty text means no headers. Non-string values are stringified.
pub fn parse_headers(text: &str) -> Result<Vec<(String, String)>, String> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Value =
        serde_json::from_str(text).map_err(|e| format!("Error parsing headers: {}", e))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| "Error parsing headers: expected a JSON object".to_string())?;

    Ok(object
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (name.clone(), value)
        })
        .collect())
}

/// Parse body JSON text for methods that carry one
pub fn parse_body(method: HttpMethod, text: &str) -> Result<Option<Value>, String> {
    if !method.carries_body() || text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| format!("Error parsing body: {}", e))
}

/// reqwest-backed collaborator with a fixed request timeout
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self { client, timeout })
    }

    async fn send(&self, request: &HttpRequestSpec) -> Result<HttpOutcome, HttpFailure> {
        let method = HttpMethod::from_str(&request.method).map_err(HttpFailure::message)?;
        let headers = parse_headers(&request.headers).map_err(HttpFailure::message)?;
        let body = parse_body(method, &request.body).map_err(HttpFailure::message)?;

        tracing::debug!("🌍 HTTP Request: {:?} {}", method, request.url);
        tracing::debug!("📋 Headers: {:?}", headers);

        let mut request_builder = self.client.request(method.to_reqwest(), &request.url);
        for (name, value) in &headers {
            request_builder = request_builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &body {
            tracing::debug!("📦 Request body: {}", body);
            request_builder = request_builder.json(body);
        }

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpFailure::message(format!("timeout of {}ms exceeded", self.timeout.as_millis()))
            } else {
                HttpFailure::message(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| HttpFailure::message(format!("Failed to read response body: {}", e)))?;

        // JSON when possible, otherwise plain text
        let data = serde_json::from_str::<Value>(&response_text)
            .unwrap_or(Value::String(response_text));

        tracing::debug!("📡 Response status: {}", status);

        if status.is_success() {
            Ok(HttpOutcome::ok(status.as_u16(), data))
        } else {
            Err(HttpFailure {
                message: format!("Request failed with status code {}", status.as_u16()),
                status: Some(status.as_u16()),
                data: Some(data),
            })
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn perform_request(&self, request: &HttpRequestSpec) -> HttpOutcome {
        match self.send(request).await {
            Ok(outcome) => {
                tracing::info!(
                    "✅ HTTP request completed: {} {} (status: {:?})",
                    request.method,
                    request.url,
                    outcome.status
                );
                outcome
            }
            Err(failure) => {
                tracing::warn!(
                    "❌ HTTP request failed: {} {} - {}",
                    request.method,
                    request.url,
                    failure.message
                );
                HttpOutcome::failed(failure)
            }
        }
    }
}
