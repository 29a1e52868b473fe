//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ConduitConfig (validated, immutable)
//!     → handed to listener / client registry
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Conditional requirements (proxy settings when proxy mode is on,
//!   credentials when an auth scheme is selected) are enforced by
//!   validation at activation time, never at request time

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{
    Authentication, ClientConfig, ConduitConfig, HttpProtocol, ListenerConfig, ProxyConfig,
    ProxyMode, UserCredentialsConfig,
};
pub use validation::{validate_client_config, validate_config, ValidationError};
