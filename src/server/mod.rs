//! Inbound HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → listener.rs (axum catch-all, timeout + trace layers)
//!     → route table (exact beats template, first-registered tie-break)
//!     → handler.rs (user flow logic)
//!     → response written back
//! ```
//!
//! # Design Decisions
//! - One route table per listening socket, owned by the listener
//! - Unmatched requests answer 404; routing never raises server errors
//! - Multipart misuse is a dedicated 500, not a silent drop

pub mod handler;
pub mod listener;

pub use handler::{handler_fn, DynRouteHandler, InboundRequest, InboundResponse, RouteHandler};
pub use listener::{HttpListener, ListenerRoutes};
