//! Market data provider clients.

mod kis;
mod kiwoom;

pub use kis::{KisConfig, KisSource};
pub use kiwoom::{KiwoomConfig, KiwoomSource};

use ats_core::error::SourceError;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Network-client timeouts. A stalled call must give its concurrency
/// permit back within a few seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(3000),
            request_timeout: Duration::from_millis(5000),
        }
    }
}

/// Substrings in an error payload that identify provider throttling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitSignatures(Vec<String>);

impl RateLimitSignatures {
    pub fn new<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            signatures
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        )
    }

    /// Whether the payload carries any known signature.
    pub fn matches(&self, payload: &str) -> bool {
        self.0.iter().any(|sig| payload.contains(sig.as_str()))
    }
}

/// Build a client with the configured timeouts and default headers.
pub(crate) fn build_client(
    http: &HttpSettings,
    headers: header::HeaderMap,
) -> Result<Client, SourceError> {
    Client::builder()
        .connect_timeout(http.connect_timeout)
        .timeout(http.request_timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| SourceError::Connection(e.to_string()))
}

pub(crate) fn header_value(name: &str, value: &str) -> Result<header::HeaderValue, SourceError> {
    header::HeaderValue::from_str(value).map_err(|_| SourceError::Connection(format!(
        "invalid value for header {}",
        name
    )))
}

/// Map a failed provider reply to the error taxonomy.
///
/// HTTP 429 and any payload carrying a rate-limit signature are throttling;
/// everything else is a plain provider error.
pub(crate) fn classify_failure(
    provider: &str,
    status: StatusCode,
    payload: &str,
    signatures: &RateLimitSignatures,
) -> SourceError {
    if status == StatusCode::TOO_MANY_REQUESTS || signatures.matches(payload) {
        SourceError::RateLimited {
            provider: provider.to_string(),
            message: truncate(payload),
        }
    } else {
        SourceError::Provider {
            provider: provider.to_string(),
            status: status.as_u16(),
            message: truncate(payload),
        }
    }
}

pub(crate) fn map_transport_error(provider: &str, error: reqwest::Error) -> SourceError {
    if error.is_decode() {
        SourceError::Parse(error.to_string())
    } else {
        SourceError::Connection(format!("{}: {}", provider, error))
    }
}

/// Read a response header as text.
pub(crate) fn response_header(headers: &header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

/// Accept a JSON string or number and keep it as text.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn truncate(payload: &str) -> String {
    const MAX: usize = 512;
    match payload.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &payload[..idx]),
        None => payload.to_string(),
    }
}
