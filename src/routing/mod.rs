//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint activation:
//!     (method, path template, handler)
//!     → template.rs (compile once, fail fast on malformed templates)
//!     → table.rs (copy-on-write binding list)
//!
//! Inbound request:
//!     (method, path)
//!     → table.rs (classify every binding, apply precedence)
//!     → RouteMatch { binding, path params } or None
//! ```
//!
//! # Design Decisions
//! - Compilation errors are registration-time failures, never deferred
//! - Resolution never fails; absence of a match is a normal outcome
//! - Exact beats template; overlapping templates resolve to the first
//!   registered binding (stable, documented tie-break)

pub mod params;
pub mod table;
pub mod template;

pub use params::{query_string_of, PathParams, QueryParams};
pub use table::{RouteBinding, RouteError, RouteMatch, RouteTable};
pub use template::{CompiledTemplate, MatcherResult, TemplateError};
