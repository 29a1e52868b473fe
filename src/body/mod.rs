//! Body execution strategies.
//!
//! # Data Flow
//! ```text
//! (method, streaming mode, buffer settings)
//!     → strategy.rs (total selection function)
//!     → ExecutionStrategy variant
//!
//! Per outbound request:
//!     BodySource (empty | buffered | stream)
//!     → strategy.execute(client, request)
//!     → buffered send with Content-Length, or chunked transfer
//!     → OutboundResponse (buffer or lazy chunk sequence)
//! ```
//!
//! # Design Decisions
//! - One strategy resolved per request; no per-request branching in
//!   calling code
//! - Failures distinguish "before any bytes sent" from "mid-stream" so
//!   the caller can judge retry safety

pub mod source;
pub mod strategy;

pub use source::{BodyError, BodySource, BodyStream};
pub use strategy::{
    BufferSettings, ExecutionStrategy, OutboundRequest, OutboundResponse, RequestError,
    StreamingMode, UnsupportedMethodError, DEFAULT_REQUEST_BUFFER_SIZE,
    DEFAULT_RESPONSE_BUFFER_SIZE,
};
