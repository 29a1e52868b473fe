//! Execution strategy selection and request execution.
//!
//! # Responsibilities
//! - Select, per outbound request, how the body goes on the wire:
//!   no body, buffered with an explicit `Content-Length`, or chunked
//! - Execute the request through a [`ClientHandle`] and hand back the
//!   response as a buffer or a lazy chunk sequence
//! - Distinguish failures before any bytes were sent from mid-stream
//!   failures so callers can decide whether a retry is safe
//!
//! # Design Decisions
//! - Selection is a total pure function over (method, streaming mode);
//!   strategies hold no shared mutable state between requests
//! - GET/HEAD/OPTIONS never send a body regardless of configuration
//! - `Always` chunks even a zero-length body; `Auto` prefers a known
//!   `Content-Length` and falls back to chunking for open-ended streams
//! - Connections return to the pool on every exit path via the pool's
//!   own drop semantics; strategies never hold a connection

use bytes::Bytes;
use futures_util::{stream, StreamExt};
use reqwest::header::{HeaderMap, AUTHORIZATION, PROXY_AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::body::source::{BodyError, BodySource, BodyStream};
use crate::client::auth::Credentials;
use crate::client::handle::ClientHandle;
use crate::observability::metrics;

/// Default I/O chunk size when streaming a request body.
pub const DEFAULT_REQUEST_BUFFER_SIZE: usize = 65536;
/// Default chunk size when consuming a response body.
pub const DEFAULT_RESPONSE_BUFFER_SIZE: usize = 65536;

/// Policy governing whether an outbound body is buffered or chunked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamingMode {
    /// Materialize the whole body and send an explicit `Content-Length`.
    None,
    /// Always use chunked transfer encoding.
    Always,
    /// `Content-Length` when the size is knowable, chunked otherwise.
    #[default]
    Auto,
}

/// Buffer sizing applied by the strategies.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BufferSettings {
    pub request_buffer_size: Option<usize>,
    pub response_buffer_size: Option<usize>,
}

impl BufferSettings {
    fn request_buffer(&self) -> usize {
        self.request_buffer_size.unwrap_or(DEFAULT_REQUEST_BUFFER_SIZE)
    }

    fn response_buffer(&self) -> usize {
        self.response_buffer_size.unwrap_or(DEFAULT_RESPONSE_BUFFER_SIZE)
    }
}

/// Raised when no strategy exists for the requested method.
#[derive(Debug, Error)]
#[error("no execution strategy available for method '{0}'")]
pub struct UnsupportedMethodError(pub Method);

/// How one outbound request transmits its body and reads its response.
/// Resolved exactly once per request; cheap to recompute on config change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// GET/HEAD/OPTIONS: no request body, ever.
    WithoutBody { response_buffer_size: usize },
    /// Buffered body with an explicit `Content-Length`.
    WithBody { response_buffer_size: usize },
    /// Forced chunked transfer, regardless of whether the size is known.
    WithStreamBody {
        request_buffer_size: usize,
        response_buffer_size: usize,
    },
    /// `Content-Length` when the size is known, chunked otherwise.
    WithAutoStreamBody {
        request_buffer_size: usize,
        response_buffer_size: usize,
    },
}

impl ExecutionStrategy {
    /// Select the strategy for one (method, streaming mode) pair.
    pub fn select(
        method: &Method,
        streaming: StreamingMode,
        buffers: &BufferSettings,
    ) -> Result<ExecutionStrategy, UnsupportedMethodError> {
        let response_buffer_size = buffers.response_buffer();
        match *method {
            Method::GET | Method::HEAD | Method::OPTIONS => {
                Ok(ExecutionStrategy::WithoutBody { response_buffer_size })
            }
            Method::POST | Method::PUT | Method::DELETE => {
                let request_buffer_size = buffers.request_buffer();
                Ok(match streaming {
                    StreamingMode::None => ExecutionStrategy::WithBody { response_buffer_size },
                    StreamingMode::Always => ExecutionStrategy::WithStreamBody {
                        request_buffer_size,
                        response_buffer_size,
                    },
                    StreamingMode::Auto => ExecutionStrategy::WithAutoStreamBody {
                        request_buffer_size,
                        response_buffer_size,
                    },
                })
            }
            _ => Err(UnsupportedMethodError(method.clone())),
        }
    }

    fn response_buffer_size(&self) -> usize {
        match *self {
            ExecutionStrategy::WithoutBody { response_buffer_size }
            | ExecutionStrategy::WithBody { response_buffer_size }
            | ExecutionStrategy::WithStreamBody {
                response_buffer_size, ..
            }
            | ExecutionStrategy::WithAutoStreamBody {
                response_buffer_size, ..
            } => response_buffer_size,
        }
    }

    /// Execute one outbound request. Exactly one strategy instance is
    /// resolved per request; the strategy owns writing the body and
    /// reading the response.
    pub async fn execute(
        &self,
        client: &ClientHandle,
        request: OutboundRequest,
    ) -> Result<OutboundResponse, RequestError> {
        let OutboundRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut payload = match *self {
            ExecutionStrategy::WithoutBody { .. } => WirePayload::None,
            ExecutionStrategy::WithBody { .. } => {
                let bytes = body.collect().await.map_err(RequestError::BeforeSend)?;
                WirePayload::Sized(bytes)
            }
            ExecutionStrategy::WithStreamBody {
                request_buffer_size, ..
            } => WirePayload::Chunked(Some(into_chunk_stream(body, request_buffer_size))),
            ExecutionStrategy::WithAutoStreamBody {
                request_buffer_size, ..
            } => match body.size_hint() {
                Some(_) => {
                    let bytes = body.collect().await.map_err(RequestError::BeforeSend)?;
                    WirePayload::Sized(bytes)
                }
                None => WirePayload::Chunked(Some(into_chunk_stream(body, request_buffer_size))),
            },
        };

        let response = send_with_auth(client, &method, &url, &headers, &mut payload).await?;

        let status = response.status();
        let response_headers = response.headers().clone();
        metrics::record_outbound(method.as_str(), status.as_u16());

        if !status.is_success() {
            // Reading the body to completion also returns the connection
            // to the pool.
            let body = response
                .bytes()
                .await
                .map_err(RequestError::ResponseRead)?;
            return Err(RequestError::Status {
                status,
                headers: response_headers,
                body,
            });
        }

        let chunk_size = self.response_buffer_size();
        let raw = response
            .bytes_stream()
            .map(|item| item.map_err(|e| BodyError::Other(e.to_string())));
        Ok(OutboundResponse {
            status,
            headers: response_headers,
            body: rechunk(raw, chunk_size),
        })
    }
}

/// One outbound request as handed to a strategy.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: BodySource,
}

/// A successful (2xx) response. The body is a lazy chunk sequence sized
/// by the strategy's response buffer; `into_bytes` collects it.
pub struct OutboundResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body: BodyStream,
}

impl OutboundResponse {
    /// Consume the response as a lazy sequence of chunks.
    pub fn into_chunks(self) -> BodyStream {
        self.body
    }

    /// Consume the response into a single buffer.
    pub async fn into_bytes(mut self) -> Result<Bytes, BodyError> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }
}

impl std::fmt::Debug for OutboundResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Failure modes of one outbound request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Body evaluation failed before anything was written to the wire;
    /// retrying is safe.
    #[error("request failed before any bytes were sent: {0}")]
    BeforeSend(#[source] BodyError),

    /// The transfer failed after bytes started flowing; retrying may
    /// duplicate a partial write upstream.
    #[error("request failed mid-stream: {0}")]
    MidStream(#[source] reqwest::Error),

    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Non-2xx response, surfaced with status, headers and body. Retry
    /// policy belongs to the caller.
    #[error("response status {status}")]
    Status {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },

    #[error("failed to read response body: {0}")]
    ResponseRead(#[source] reqwest::Error),
}

enum WirePayload {
    None,
    /// Replayable: kept in memory, so a digest challenge can be answered.
    Sized(Bytes),
    /// One-shot: consumed on first send, no challenge retry possible.
    Chunked(Option<BodyStream>),
}

impl WirePayload {
    fn replayable(&self) -> bool {
        !matches!(self, WirePayload::Chunked(_))
    }
}

async fn send_with_auth(
    client: &ClientHandle,
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
    payload: &mut WirePayload,
) -> Result<reqwest::Response, RequestError> {
    let response = send_once(client, method, url, headers, payload, None).await?;

    // Digest authentication is challenge-driven: answer 401/407 once,
    // but only when the body can be replayed.
    if payload.replayable() {
        let challenge_answer = match response.status() {
            StatusCode::UNAUTHORIZED => client
                .credentials()
                .origin_digest(url)
                .and_then(|creds| answer(&response, "www-authenticate", creds, method, url))
                .map(|value| (AUTHORIZATION, value)),
            StatusCode::PROXY_AUTHENTICATION_REQUIRED => client
                .credentials()
                .proxy_digest()
                .and_then(|creds| answer(&response, "proxy-authenticate", creds, method, url))
                .map(|value| (PROXY_AUTHORIZATION, value)),
            _ => None,
        };

        if let Some((header, value)) = challenge_answer {
            tracing::debug!(url = %url, header = %header, "answering digest challenge");
            return send_once(client, method, url, headers, payload, Some((header, value))).await;
        }
    }

    Ok(response)
}

fn answer(
    response: &reqwest::Response,
    challenge_header: &str,
    credentials: &Credentials,
    method: &Method,
    url: &Url,
) -> Option<String> {
    let challenge = response
        .headers()
        .get(challenge_header)
        .and_then(|v| v.to_str().ok())?;
    let uri = match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    };
    credentials.answer_digest_challenge(challenge, method.as_str(), &uri)
}

async fn send_once(
    client: &ClientHandle,
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
    payload: &mut WirePayload,
    auth_header: Option<(reqwest::header::HeaderName, String)>,
) -> Result<reqwest::Response, RequestError> {
    let mut builder = client
        .inner()
        .request(method.clone(), url.clone())
        .headers(headers.clone());

    // Preemptive basic auth for the origin.
    if auth_header.is_none() {
        if let Some(value) = client.credentials().origin_basic_header(url) {
            builder = builder.header(AUTHORIZATION, value);
        }
    }
    if let Some((name, value)) = auth_header {
        builder = builder.header(name, value);
    }

    builder = match payload {
        WirePayload::None => builder,
        WirePayload::Sized(bytes) => builder.body(bytes.clone()),
        WirePayload::Chunked(stream) => {
            let stream = stream
                .take()
                .expect("chunked payload already consumed");
            builder.body(reqwest::Body::wrap_stream(stream))
        }
    };

    builder.send().await.map_err(map_send_error)
}

fn map_send_error(error: reqwest::Error) -> RequestError {
    if error.is_timeout() {
        RequestError::Timeout(error)
    } else if error.is_connect() {
        RequestError::Connect(error)
    } else if error.is_body() || error.is_request() {
        RequestError::MidStream(error)
    } else {
        RequestError::Transport(error)
    }
}

/// Convert a body source into the chunk stream used for chunked sends.
fn into_chunk_stream(body: BodySource, chunk_size: usize) -> BodyStream {
    match body {
        BodySource::Empty => Box::pin(stream::empty()),
        BodySource::Complete(bytes) => {
            let chunk_size = chunk_size.max(1);
            let chunks: Vec<Result<Bytes, BodyError>> = (0..bytes.len())
                .step_by(chunk_size)
                .map(|start| {
                    let end = (start + chunk_size).min(bytes.len());
                    Ok(bytes.slice(start..end))
                })
                .collect();
            Box::pin(stream::iter(chunks))
        }
        BodySource::Stream { stream, .. } => rechunk(stream, chunk_size),
    }
}

struct RechunkState<S> {
    inner: S,
    buf: bytes::BytesMut,
    done: bool,
}

/// Coalesce or split a chunk stream so emitted chunks are at most `cap`
/// bytes, and below `cap` only at the end of the stream.
fn rechunk<S>(inner: S, cap: usize) -> BodyStream
where
    S: futures_util::Stream<Item = Result<Bytes, BodyError>> + Send + 'static,
{
    let cap = cap.max(1);
    let state = RechunkState {
        inner: Box::pin(inner),
        buf: bytes::BytesMut::new(),
        done: false,
    };
    Box::pin(stream::unfold(state, move |mut state| async move {
        loop {
            if state.buf.len() >= cap {
                let chunk = state.buf.split_to(cap).freeze();
                return Some((Ok(chunk), state));
            }
            if state.done {
                if state.buf.is_empty() {
                    return None;
                }
                let chunk = state.buf.split().freeze();
                return Some((Ok(chunk), state));
            }
            match state.inner.next().await {
                Some(Ok(bytes)) => state.buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => state.done = true,
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn buffers() -> BufferSettings {
        BufferSettings::default()
    }

    #[test]
    fn bodyless_methods_ignore_streaming_mode() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            for mode in [StreamingMode::None, StreamingMode::Always, StreamingMode::Auto] {
                let strategy = ExecutionStrategy::select(&method, mode, &buffers()).unwrap();
                assert!(
                    matches!(strategy, ExecutionStrategy::WithoutBody { .. }),
                    "{} with {:?} must be bodyless",
                    method,
                    mode
                );
            }
        }
    }

    #[test]
    fn body_methods_follow_streaming_mode() {
        for method in [Method::POST, Method::PUT, Method::DELETE] {
            assert!(matches!(
                ExecutionStrategy::select(&method, StreamingMode::None, &buffers()).unwrap(),
                ExecutionStrategy::WithBody { .. }
            ));
            assert!(matches!(
                ExecutionStrategy::select(&method, StreamingMode::Always, &buffers()).unwrap(),
                ExecutionStrategy::WithStreamBody { .. }
            ));
            assert!(matches!(
                ExecutionStrategy::select(&method, StreamingMode::Auto, &buffers()).unwrap(),
                ExecutionStrategy::WithAutoStreamBody { .. }
            ));
        }
    }

    #[test]
    fn unsupported_method_names_the_method() {
        let err = ExecutionStrategy::select(&Method::PATCH, StreamingMode::Auto, &buffers())
            .unwrap_err();
        assert!(err.to_string().contains("PATCH"));
    }

    #[test]
    fn buffer_overrides_are_applied() {
        let buffers = BufferSettings {
            request_buffer_size: Some(1024),
            response_buffer_size: Some(2048),
        };
        match ExecutionStrategy::select(&Method::POST, StreamingMode::Always, &buffers).unwrap() {
            ExecutionStrategy::WithStreamBody {
                request_buffer_size,
                response_buffer_size,
            } => {
                assert_eq!(request_buffer_size, 1024);
                assert_eq!(response_buffer_size, 2048);
            }
            other => panic!("unexpected strategy: {:?}", other),
        }
    }

    #[tokio::test]
    async fn rechunk_splits_and_coalesces() {
        let input = stream::iter(vec![
            Ok(Bytes::from_static(b"abcde")),
            Ok(Bytes::from_static(b"f")),
            Ok(Bytes::from_static(b"ghij")),
        ]);
        let chunks: Vec<Bytes> = rechunk(input, 4)
            .map(|c| c.unwrap())
            .collect::<Vec<_>>()
            .await;
        assert_eq!(chunks, vec![
            Bytes::from_static(b"abcd"),
            Bytes::from_static(b"efgh"),
            Bytes::from_static(b"ij"),
        ]);
    }

    #[tokio::test]
    async fn complete_body_is_split_into_request_buffer_chunks() {
        let stream = into_chunk_stream(BodySource::from_bytes("0123456789"), 4);
        let chunks: Vec<Bytes> = stream.map(|c| c.unwrap()).collect::<Vec<_>>().await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], Bytes::from_static(b"89"));
    }
}
