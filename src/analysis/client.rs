use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::model::{AnalysisRequest, AnalysisResult, RemoteFailure};
use crate::config::AnalysisConfig;
use crate::error::{CoreError, CoreResult};

/// The remote analysis capability: one request, one reply.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn invoke(&self, request: &AnalysisRequest) -> Result<AnalysisResult, RemoteFailure>;
}

/// JSON-over-HTTP client for the analysis function.
pub struct HttpAnalysisClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAnalysisClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::config("http_client", format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, endpoint: endpoint.into(), api_key })
    }

    pub fn from_config(cfg: &AnalysisConfig) -> CoreResult<Self> {
        let Some(endpoint) = cfg.endpoint.clone() else {
            return Err(CoreError::config("missing_endpoint", "analysis endpoint is not configured"));
        };
        Self::new(endpoint, cfg.api_key.clone(), Duration::from_millis(cfg.timeout_ms))
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn invoke(&self, request: &AnalysisRequest) -> Result<AnalysisResult, RemoteFailure> {
        let mut req = self.http.post(&self.endpoint).json(request);
        if let Some(key) = self.api_key.as_deref() {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| {
            let failure = RemoteFailure::new(format!("transport error: {}", e));
            if e.is_timeout() { failure.with_code("timeout") } else { failure }
        })?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| RemoteFailure::new(format!("failed to read response body: {}", e)))?;
        debug!(target: "stratum::analysis", "analysis.http status={} bytes={}", status, body.len());
        decode_reply(status, &body)
    }
}

fn code_for_status(status: u16) -> Option<&'static str> {
    match status {
        429 => Some("rate_limited"),
        402 => Some("quota_exhausted"),
        _ => None,
    }
}

/// Turn a raw HTTP reply into a result or a failure. An `{error, code?}`
/// envelope is a failure even when it arrives with a 2xx status.
pub fn decode_reply(status: u16, body: &str) -> Result<AnalysisResult, RemoteFailure> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    if let Some(err) = parsed.as_ref().and_then(|v| v.get("error")).and_then(|e| e.as_str()) {
        let code = parsed
            .as_ref()
            .and_then(|v| v.get("code"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .or_else(|| code_for_status(status).map(str::to_string));
        return Err(RemoteFailure { message: err.to_string(), code });
    }
    if !(200..300).contains(&status) {
        let text = body.trim();
        let message = if text.is_empty() { format!("HTTP {}", status) } else { format!("HTTP {}: {}", status, text) };
        let failure = RemoteFailure::new(message);
        return Err(match code_for_status(status) {
            Some(code) => failure.with_code(code),
            None => failure,
        });
    }
    let Some(value) = parsed else {
        return Err(RemoteFailure::new("malformed analysis result: body is not JSON"));
    };
    serde_json::from_value(value).map_err(|e| RemoteFailure::new(format!("malformed analysis result: {}", e)))
}
