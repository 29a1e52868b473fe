//! HTTP conduit: the HTTP endpoints of a flow-based integration runtime.
//!
//! # Architecture Overview
//!
//! ```text
//! Inbound socket ──▶ server (listener) ──▶ routing (route table) ──▶ handler
//!
//! Flow logic ──▶ body (execution strategy) ──▶ client (shared handle) ──▶ origin
//!                                                  ▲
//!                                    client registry (one pool per
//!                                    configuration identity, refcounted)
//! ```
//!
//! Three subsystems carry the real invariants:
//!
//! - [`routing`]: the per-socket route table. Exact matches beat template
//!   matches, overlapping templates resolve in registration order, and
//!   template compilation fails at registration time, never per request.
//! - [`client`]: the shared client registry. At most one live pool per
//!   configuration identity, torn down exactly once when its last holder
//!   releases it.
//! - [`body`]: per-request execution strategies choosing between no body,
//!   buffered `Content-Length` transfer, and chunked streaming.
//!
//! Everything else (config loading, the evaluator seam, observability) is
//! supporting structure around those three.

// Core subsystems
pub mod body;
pub mod client;
pub mod routing;
pub mod server;

// Supporting structure
pub mod config;
pub mod eval;
pub mod observability;

pub use body::{BodySource, ExecutionStrategy, OutboundRequest, StreamingMode};
pub use client::{ClientHandle, ClientRegistry, HolderId};
pub use config::{ClientConfig, ConduitConfig, ListenerConfig};
pub use routing::RouteTable;
pub use server::{HttpListener, InboundRequest, InboundResponse};
