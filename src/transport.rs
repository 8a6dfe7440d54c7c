// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! HTTP transport
//!
//! Two layers:
//! - [`Transport`] sends one request and returns the raw status and body.
//!   [`HttpTransport`] implements it with a blocking `reqwest` client; tests
//!   substitute an in-memory catalog.
//! - [`Rest`] does JSON in and out, maps status codes to [`HttpError`]s and
//!   retries a transient failure once after a one-second delay.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Delay before the single retry of a transient failure
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// HTTP verbs used against the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// Whether a failure is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Timeouts, connection resets, 409, 429 and 5xx
    Transient,
    /// Everything else
    Fatal,
}

/// A failed HTTP exchange
#[derive(Debug, Clone, Error)]
#[error("{}{url} [{attribution}]: {message}", .status.map(|s| format!("HTTP {s} from ")).unwrap_or_default())]
pub struct HttpError {
    /// Status code, if a response was received
    pub status: Option<u16>,
    /// Request URL
    pub url: String,
    /// Caller tag used in logs
    pub attribution: String,
    /// Server message or client-side failure
    pub message: String,
    /// Retry class
    pub class: FailureClass,
}

impl HttpError {
    /// True when the server answered 404
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// One outgoing request
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Verb
    pub method: Method,
    /// Absolute URL including query string
    pub url: &'a str,
    /// Bearer token; `None` for anonymous reads
    pub token: Option<&'a str>,
    /// JSON body
    pub body: Option<&'a str>,
    /// Caller tag for logs
    pub attribution: &'a str,
}

/// Status and body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status
    pub status: u16,
    /// Response body
    pub body: String,
}

/// Sends a single request
///
/// Implementations return `Err` only when no response was received.
pub trait Transport: Send + Sync {
    /// Execute one request without retrying
    fn execute(&self, request: &Request<'_>) -> Result<RawResponse, HttpError>;
}

/// [`Transport`] over a blocking `reqwest` client
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("osscatalog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError {
                status: None,
                url: String::new(),
                attribution: "client-init".into(),
                message: e.to_string(),
                class: FailureClass::Fatal,
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &Request<'_>) -> Result<RawResponse, HttpError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(request.url),
            Method::Post => self.client.post(request.url),
            Method::Put => self.client.put(request.url),
            Method::Delete => self.client.delete(request.url),
        };
        builder = builder.header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = request.token.filter(|t| !t.is_empty()) {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let failure = |e: reqwest::Error| HttpError {
            status: None,
            url: request.url.to_string(),
            attribution: request.attribution.to_string(),
            class: if e.is_timeout() || e.is_connect() || e.is_request() {
                FailureClass::Transient
            } else {
                FailureClass::Fatal
            },
            message: e.to_string(),
        };

        let response = builder.send().map_err(failure)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(failure)?;
        Ok(RawResponse { status, body })
    }
}

/// Retry class for a non-2xx status
#[must_use]
pub fn classify_status(status: u16) -> FailureClass {
    match status {
        409 | 429 | 500..=599 => FailureClass::Transient,
        _ => FailureClass::Fatal,
    }
}

/// JSON request layer with status mapping and a single retry
#[derive(Clone)]
pub struct Rest {
    transport: Arc<dyn Transport>,
    retry_delay: Duration,
}

impl Rest {
    /// Wrap a transport with the default retry delay
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport, retry_delay: RETRY_DELAY }
    }

    /// Override the retry delay (tests use zero)
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// GET `url` and decode the JSON body
    pub fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        token: Option<&str>,
        attribution: &str,
    ) -> Result<T, HttpError> {
        self.send::<(), T>(Method::Get, url, token, None, attribution)
    }

    /// Send `body` as JSON with `method` and decode the JSON reply
    pub fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<&B>,
        attribution: &str,
    ) -> Result<T, HttpError> {
        let encoded = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| HttpError {
                status: None,
                url: url.to_string(),
                attribution: attribution.to_string(),
                message: format!("cannot encode request body: {e}"),
                class: FailureClass::Fatal,
            })?;
        let request = Request { method, url, token, body: encoded.as_deref(), attribution };

        let response = match self.attempt(&request) {
            Err(e) if e.class == FailureClass::Transient => {
                warn!(%method, url, attribution, error = %e, "transient failure, retrying once");
                std::thread::sleep(self.retry_delay);
                self.attempt(&request)?
            }
            other => other?,
        };

        let text = if response.body.trim().is_empty() { "null" } else { response.body.as_str() };
        serde_json::from_str(text).map_err(|e| HttpError {
            status: Some(response.status),
            url: url.to_string(),
            attribution: attribution.to_string(),
            message: format!("cannot decode response: {e}"),
            class: FailureClass::Fatal,
        })
    }

    fn attempt(&self, request: &Request<'_>) -> Result<RawResponse, HttpError> {
        debug!(method = %request.method, url = request.url, attribution = request.attribution, "catalog request");
        if let Some(body) = request.body {
            trace!(body, "request body");
        }
        let response = self.transport.execute(request)?;
        trace!(status = response.status, body = %response.body, "response");
        if (200..300).contains(&response.status) {
            return Ok(response);
        }
        Err(HttpError {
            status: Some(response.status),
            url: request.url.to_string(),
            attribution: request.attribution.to_string(),
            message: response.body.chars().take(512).collect(),
            class: classify_status(response.status),
        })
    }
}
