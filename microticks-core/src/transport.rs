//! Transport boundary for the Microticks web API
//!
//! All outbound traffic goes through the [`Transport`] trait: one POST
//! per call, form-encoded request body, JSON response body. The client
//! core never touches HTTP directly, so tests (and offline mode) swap
//! the transport without touching queue or session logic.

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::TransportFailure;

/// JSON-object payload POSTed to the Microticks API.
pub type Payload = serde_json::Map<String, Value>;

/// Outcome of a single dispatch: parsed JSON response body, or the
/// failure that ended the request.
pub type TransportResult = std::result::Result<Value, TransportFailure>;

/// A single-request transport to the Microticks server.
///
/// Implementations must not retry; retry policy belongs to callers.
pub trait Transport: Send + Sync + 'static {
    /// POST `payload` to `url` and resolve with the response body.
    fn send(&self, url: String, payload: Payload) -> BoxFuture<'_, TransportResult>;
}

/// HTTP transport backed by reqwest.
///
/// The Microticks server reads form-encoded request bodies and answers
/// with JSON. No request timeout is configured: a hung request holds
/// the dispatch queue until the server answers or the connection dies.
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with default reqwest settings.
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(&self, url: String, payload: Payload) -> BoxFuture<'_, TransportResult> {
        Box::pin(async move {
            let form = form_fields(&payload);

            let response = self
                .http_client
                .post(&url)
                .form(&form)
                .send()
                .await
                .map_err(TransportFailure::network)?;

            let status = response.status();

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".to_string());
                return Err(TransportFailure {
                    status: status.as_u16(),
                    status_text: status.canonical_reason().unwrap_or("").to_string(),
                    body: error_text,
                });
            }

            response.json::<Value>().await.map_err(|e| TransportFailure {
                status: status.as_u16(),
                status_text: "invalid JSON response".to_string(),
                body: e.to_string(),
            })
        })
    }
}

/// Flatten a JSON payload into form fields.
///
/// Strings pass through as-is, null becomes the empty string, any other
/// value is rendered as compact JSON.
fn form_fields(payload: &Payload) -> Vec<(String, String)> {
    payload
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

/// Offline transport selected by the `"dummy"` host sentinel.
///
/// Performs no I/O. Each send defers one scheduler turn, so completion
/// still lands after the call like a real round trip, then resolves
/// with an empty JSON object.
pub struct DummyTransport;

impl Transport for DummyTransport {
    fn send(&self, _url: String, _payload: Payload) -> BoxFuture<'_, TransportResult> {
        Box::pin(async {
            tokio::task::yield_now().await;
            Ok(Value::Object(Payload::new()))
        })
    }
}
