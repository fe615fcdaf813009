//! Injected HTTP capability.
//!
//! Adapters never touch a concrete client; they hand an [`HttpRequest`] to
//! whatever [`HttpClient`] the caller wired in. [`ReqwestClient`] is the
//! production implementation.

pub mod relay;
#[cfg(test)]
pub(crate) mod testing;

pub use relay::RelayEndpoint;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::MailConfig;
use crate::error::{ConfigError, ProviderError};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request as built by a provider adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Set a header with `key` and `value`.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Mark the request as carrying JSON, with an optional body.
    pub fn json_body(mut self, body: Option<serde_json::Value>) -> Self {
        self.body = body.map(|b| b.to_string());
        self.header("Content-Type", "application/json")
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decode the body as JSON on behalf of `provider`.
    pub fn json<T: DeserializeOwned>(&self, provider: &str) -> Result<T, ProviderError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ProviderError::malformed(provider, format!("invalid JSON: {e}")))
    }

    /// Fail with [`ProviderError::Status`] unless the status is 2xx.
    pub fn error_for_status(self, provider: &str) -> Result<Self, ProviderError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ProviderError::Status {
                provider: provider.to_string(),
                status: self.status,
            })
        }
    }
}

/// The network transport the core is handed.
///
/// Implementations return `Err` only when no response arrived at all; any
/// status code, including 4xx/5xx, is a successful `HttpResponse`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError>;
}

/// [`HttpClient`] backed by `reqwest`.
pub struct ReqwestClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestClient {
    /// Build a client using the timeout and user agent from `config`.
    pub fn new(config: &MailConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            timeout: config.request_timeout,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let url = request.url;
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    url: url.clone(),
                    timeout: self.timeout,
                }
            } else {
                ProviderError::Transport {
                    url: url.clone(),
                    reason: e.to_string(),
                }
            }
        };

        let response = builder.send().await.map_err(map_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_err)?;

        tracing::debug!(url = %url, status, bytes = body.len(), "HTTP response");
        Ok(HttpResponse { status, body })
    }
}
