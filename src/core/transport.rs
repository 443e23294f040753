//! HTTP transport boundary
//!
//! The dispatch core never talks to `reqwest` directly. It submits
//! [`OutboundCall`]s through the [`HttpTransport`] trait, and the pair of
//! transports it uses (plaintext and HTTPS-only) is produced by a
//! [`TransportFactory`] the first time a request needs them.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::TranslationResponse;

/// HTTP method of an outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A fully built request, ready to hand to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl OutboundCall {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<HttpResponse> for TranslationResponse {
    fn from(response: HttpResponse) -> Self {
        TranslationResponse {
            status: response.status,
            body: response.body,
        }
    }
}

/// Asynchronous request submission.
///
/// `Ok` means a response arrived, whatever its status. `Err` means the call
/// failed before any response (connect, DNS, TLS, timeout).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn submit(&self, call: OutboundCall) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    label: &'static str,
    cleartext_only: bool,
}

impl ReqwestTransport {
    fn builder(timeout: Duration) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
    }

    /// Client for the token-based provider's plain `http://` endpoint.
    /// Refuses `https://` URLs; the encrypted client covers those.
    pub fn plaintext(timeout: Duration) -> Result<Self> {
        let client = Self::builder(timeout).build()?;
        Ok(Self {
            client,
            label: "plaintext",
            cleartext_only: true,
        })
    }

    /// Client that refuses anything but `https://`
    pub fn encrypted(timeout: Duration) -> Result<Self> {
        let client = Self::builder(timeout).https_only(true).build()?;
        Ok(Self {
            client,
            label: "encrypted",
            cleartext_only: false,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn submit(&self, call: OutboundCall) -> Result<HttpResponse> {
        if self.cleartext_only && !call.url.starts_with("http://") {
            return Err(TranslationError::NetworkError {
                message: format!("{} transport only accepts http:// URLs", self.label),
            });
        }

        let method = match call.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut request = self.client.request(method, &call.url);
        for (name, value) in &call.headers {
            request = request.header(*name, value);
        }
        if call.method == Method::Post {
            request = request.body(call.body);
        }

        debug!("Submitting {:?} over {} transport", call.method, self.label);

        let response = request
            .send()
            .await
            .map_err(|e| TranslationError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TranslationError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(HttpResponse { status, body })
    }
}

/// The two transports guarded by the refresh gate
#[derive(Clone)]
pub struct Transports {
    pub plaintext: Arc<dyn HttpTransport>,
    pub encrypted: Arc<dyn HttpTransport>,
}

impl fmt::Debug for Transports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transports").finish_non_exhaustive()
    }
}

/// Builds the transport pair; called at most once per dispatch context.
pub trait TransportFactory: Send + Sync {
    fn build(&self) -> Result<Transports>;
}

/// Production factory producing two `reqwest` clients
#[derive(Debug, Clone)]
pub struct ReqwestTransportFactory {
    timeout: Duration,
}

impl ReqwestTransportFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl TransportFactory for ReqwestTransportFactory {
    fn build(&self) -> Result<Transports> {
        Ok(Transports {
            plaintext: Arc::new(ReqwestTransport::plaintext(self.timeout)?),
            encrypted: Arc::new(ReqwestTransport::encrypted(self.timeout)?),
        })
    }
}
