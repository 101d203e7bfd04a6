use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::model::AnalysisRequest;

/// Content type of every analysis request.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Raw response handed back to the controller before any parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase for the status.
    pub status_text: String,
    /// Unparsed body.
    pub body: String,
}

impl TransportResponse {
    /// Builds a response with the canonical reason phrase for `status`.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text(status),
            body: body.into(),
        }
    }

    /// Builds a response carrying a JSON body.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown Status")
        .to_string()
}

/// Errors raised before a response was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, reset, or unreadable body.
    #[error("{0}")]
    Network(String),
    /// The configured timeout elapsed.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Abstraction over the HTTP client posting analysis requests.
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// POSTs the request as JSON to `endpoint`.
    async fn post_json(
        &self,
        endpoint: &str,
        request: &AnalysisRequest,
    ) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Creates a transport with an optional per-request timeout.
    pub fn new(timeout: Option<Duration>) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            timeout,
        })
    }
}

#[async_trait]
impl AnalysisTransport for HttpTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        request: &AnalysisRequest,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(request);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await.map_err(|err| self.classify(&err))?;
        let status = response.status();
        let status_text = status
            .canonical_reason()
            .unwrap_or("Unknown Status")
            .to_string();
        let body = response.text().await.map_err(|err| self.classify(&err))?;
        Ok(TransportResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}

impl HttpTransport {
    fn classify(&self, err: &reqwest::Error) -> TransportError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => TransportError::Timeout(timeout),
            _ => TransportError::Network(root_cause(err)),
        }
    }
}

fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

/// A request observed by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Target endpoint.
    pub endpoint: String,
    /// Content type that would be sent.
    pub content_type: String,
    /// Request body.
    pub body: AnalysisRequest,
}

#[derive(Debug)]
struct ScriptedReply {
    delay: Duration,
    outcome: Result<TransportResponse, TransportError>,
}

/// Transport replaying queued replies with per-call latency.
///
/// Replies are taken in call order when the request starts, then held for
/// their delay, so overlapping calls can be made to settle in any order.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    #[must_use]
    pub fn respond(self, delay: Duration, response: TransportResponse) -> Self {
        self.push(delay, Ok(response));
        self
    }

    /// Queues a transport failure.
    #[must_use]
    pub fn fail(self, delay: Duration, error: TransportError) -> Self {
        self.push(delay, Err(error));
        self
    }

    /// Queues an outcome on a shared transport.
    pub fn push(&self, delay: Duration, outcome: Result<TransportResponse, TransportError>) {
        self.replies
            .lock()
            .push_back(ScriptedReply { delay, outcome });
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AnalysisTransport for ScriptedTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        request: &AnalysisRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(RecordedRequest {
            endpoint: endpoint.to_string(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            body: request.clone(),
        });
        let reply = self.replies.lock().pop_front();
        let Some(reply) = reply else {
            return Err(TransportError::Network("no scripted reply left".into()));
        };
        if !reply.delay.is_zero() {
            sleep(reply.delay).await;
        }
        reply.outcome
    }
}
