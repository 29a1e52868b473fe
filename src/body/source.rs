//! Request body sources.
//!
//! A [`BodySource`] is what the caller hands to an execution strategy:
//! nothing, a fully materialized buffer, or an open-ended stream whose
//! size may or may not be known up front. The strategy decides how the
//! source is put on the wire.

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use thiserror::Error;

use crate::eval::EvalError;

/// Error produced while evaluating or reading a request body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("body read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// A lazily produced sequence of body chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes, BodyError>>;

/// The request body as supplied by the caller.
pub enum BodySource {
    /// No body at all.
    Empty,
    /// Fully materialized body with a known size.
    Complete(Bytes),
    /// Streamed body; `size_hint` is the total size when knowable.
    Stream {
        size_hint: Option<u64>,
        stream: BodyStream,
    },
}

impl BodySource {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        BodySource::Complete(bytes.into())
    }

    pub fn stream(stream: BodyStream) -> Self {
        BodySource::Stream {
            size_hint: None,
            stream,
        }
    }

    pub fn sized_stream(size: u64, stream: BodyStream) -> Self {
        BodySource::Stream {
            size_hint: Some(size),
            stream,
        }
    }

    /// Total body size when knowable in advance.
    pub fn size_hint(&self) -> Option<u64> {
        match self {
            BodySource::Empty => Some(0),
            BodySource::Complete(bytes) => Some(bytes.len() as u64),
            BodySource::Stream { size_hint, .. } => *size_hint,
        }
    }

    /// Materialize the source into a single buffer. Failures here happen
    /// before any bytes were sent upstream.
    pub async fn collect(self) -> Result<Bytes, BodyError> {
        match self {
            BodySource::Empty => Ok(Bytes::new()),
            BodySource::Complete(bytes) => Ok(bytes),
            BodySource::Stream { mut stream, .. } => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl std::fmt::Debug for BodySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodySource::Empty => write!(f, "BodySource::Empty"),
            BodySource::Complete(bytes) => {
                write!(f, "BodySource::Complete({} bytes)", bytes.len())
            }
            BodySource::Stream { size_hint, .. } => {
                write!(f, "BodySource::Stream(size_hint: {:?})", size_hint)
            }
        }
    }
}
