use std::{collections::VecDeque, pin::Pin, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use tokio::sync::Mutex;
use vectorhub_core::VectorHubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// Newline-delimited JSON, one value per line.
    NdJson(Vec<Value>),
}

impl Body {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn lines(&self) -> &[Value] {
        match self {
            Body::NdJson(lines) => lines,
            _ => &[],
        }
    }

    /// Encode the payload as sent on the wire.
    pub fn encode(&self) -> Result<Option<String>, VectorHubError> {
        match self {
            Body::Empty => Ok(None),
            Body::Json(value) => Ok(Some(serde_json::to_string(value)?)),
            Body::NdJson(lines) => {
                let encoded = lines
                    .iter()
                    .map(serde_json::to_string)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(encoded.join("\n")))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn with_ndjson(mut self, lines: Vec<Value>) -> Self {
        self.body = Body::NdJson(lines);
        self
    }

    /// Look up a header value, ignoring ASCII case of the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status code and raw body text. Adapters decide how to decode the body.
#[derive(Debug, Clone, PartialEq)]
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

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        vectorhub_core::is_success(self.status)
    }

    pub fn parse_json(&self) -> Result<Value, VectorHubError> {
        serde_json::from_str(&self.body).map_err(|e| {
            VectorHubError::Parsing(format!("invalid JSON response ({e}): {}", self.body))
        })
    }
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, VectorHubError>> + Send>>;

/// The capability to send one HTTP request and receive its response.
///
/// Implementations must be safe to share across tasks; adapters hold them
/// behind an `Arc` and call them concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, VectorHubError>;
    async fn send_stream(&self, request: HttpRequest) -> Result<ByteStream, VectorHubError>;
}

/// Production transport using reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Bound every request by `timeout`; an expired deadline surfaces as
    /// [`VectorHubError::Transport`].
    pub fn with_timeout(timeout: Duration) -> Result<Self, VectorHubError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VectorHubError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn builder(&self, request: &HttpRequest) -> Result<reqwest::RequestBuilder, VectorHubError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body.encode()? {
            builder = builder.body(body);
        }
        Ok(builder)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, VectorHubError> {
        tracing::debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let response = self
            .builder(&request)?
            .send()
            .await
            .map_err(|e| VectorHubError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| VectorHubError::Transport(format!("failed to read response: {e}")))?;
        tracing::debug!(status, url = %request.url, "received response");

        Ok(HttpResponse { status, body })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<ByteStream, VectorHubError> {
        use futures::StreamExt;

        let response = self
            .builder(&request)?
            .send()
            .await
            .map_err(|e| VectorHubError::Transport(format!("HTTP stream request failed: {e}")))?;

        let status = response.status().as_u16();
        if !vectorhub_core::is_success(status) {
            let body = response.text().await.map_err(|e| {
                VectorHubError::Transport(format!(
                    "failed to read error response (HTTP {status}): {e}"
                ))
            })?;
            return Err(VectorHubError::from_status("HTTP", status, &body));
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| VectorHubError::Transport(format!("stream error: {e}")))
        });

        Ok(Box::pin(stream))
    }
}

/// Test transport with queued responses. Every request is recorded so tests
/// can assert on the exact wire shape.
pub struct FakeTransport {
    responses: Arc<Mutex<VecDeque<Result<HttpResponse, VectorHubError>>>>,
    stream_chunks: Arc<Mutex<VecDeque<Vec<bytes::Bytes>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            stream_chunks: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push_response(&self, response: HttpResponse) -> &Self {
        self.responses
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Ok(response));
        self
    }

    /// Queue a response whose body is `body` encoded as JSON.
    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push_response(HttpResponse::json(status, &body))
    }

    pub fn push_error(&self, error: VectorHubError) -> &Self {
        self.responses
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Err(error));
        self
    }

    pub fn push_stream_chunks(&self, chunks: Vec<bytes::Bytes>) -> &Self {
        self.stream_chunks
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(chunks);
        self
    }

    /// All requests sent so far, oldest first.
    pub async fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().await.last().cloned()
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, VectorHubError> {
        self.requests.lock().await.push(request);
        let mut responses = self.responses.lock().await;
        responses.pop_front().unwrap_or_else(|| {
            Err(VectorHubError::Transport(
                "FakeTransport exhausted".to_string(),
            ))
        })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<ByteStream, VectorHubError> {
        self.requests.lock().await.push(request);
        let mut stream_chunks = self.stream_chunks.lock().await;
        let chunks = stream_chunks.pop_front().unwrap_or_default();

        let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, VectorHubError>));
        Ok(Box::pin(stream))
    }
}
