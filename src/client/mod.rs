//! Outbound client subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint activation:
//!     ClientConfig (identity, pool, TLS, auth, proxy)
//!     → registry.rs (acquire: reuse or build under the entry lock)
//!     → handle.rs (pool + credential store construction)
//!
//! Endpoint deactivation:
//!     registry.release(config_id, holder)
//!     → teardown on last holder, exactly once
//!
//! Per request:
//!     uri.rs (expand dynamic path/query parameters)
//!     → body strategy executes through the shared ClientHandle
//!     → auth.rs (preemptive basic, digest challenge answers)
//! ```

pub mod auth;
pub mod handle;
pub mod registry;
pub mod uri;

pub use auth::{CredentialStore, Credentials, HostKey};
pub use handle::{
    ClientError, ClientHandle, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_POOL_CONNECTIONS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SOCKET_TIMEOUT_MS,
};
pub use registry::{ClientRegistry, HolderId};
pub use uri::{UriError, UriEvaluator};
