//! Configuration schema definitions.
//!
//! This module defines the value objects handed to the listener and the
//! shared client registry. All types derive Serde traits for
//! deserialization from config files and are immutable once loaded.

use serde::{Deserialize, Serialize};

/// Root configuration for one conduit deployment: a single inbound
/// listener plus any number of outbound client configurations.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConduitConfig {
    /// Inbound listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Outbound client configurations, shared by configuration id.
    pub clients: Vec<ClientConfig>,
}

/// Inbound listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind host.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Maximum accepted request body size in bytes.
    pub max_request_size: usize,

    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_request_size: 10 * 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

impl ListenerConfig {
    /// Bind address in `host:port` form.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Target protocol for an outbound client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HttpProtocol {
    #[default]
    Http,
    Https,
}

impl HttpProtocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            HttpProtocol::Http => "http",
            HttpProtocol::Https => "https",
        }
    }
}

/// Authentication scheme, used for both origin and proxy credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Authentication {
    #[default]
    None,
    Basic,
    Digest,
}

/// Whether requests are sent through a forward proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    #[default]
    Off,
    Proxy,
}

/// Username/password pair used by both basic and digest schemes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserCredentialsConfig {
    pub username: String,
    pub password: String,
}

/// Forward proxy configuration, with its own independent authentication.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Proxy host.
    pub host: String,

    /// Proxy port.
    pub port: u16,

    /// Authentication scheme against the proxy itself.
    #[serde(default)]
    pub authentication: Authentication,

    /// Credentials when `authentication = basic`.
    pub basic_authentication: Option<UserCredentialsConfig>,

    /// Credentials when `authentication = digest`.
    pub digest_authentication: Option<UserCredentialsConfig>,
}

/// Outbound client configuration. The `id` is the identity under which
/// the built client is shared across component activations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Unique configuration identity.
    pub id: String,

    /// Origin host.
    pub host: String,

    /// Origin port.
    pub port: u16,

    /// Origin protocol.
    pub protocol: HttpProtocol,

    /// Base path prepended to every request path.
    pub base_path: String,

    /// Connection pool ceiling (total and per route). Default 10.
    pub max_pool_connections: Option<usize>,

    /// Accept any certificate chain and skip hostname verification.
    pub allow_self_signed: Option<bool>,

    /// Follow 3xx redirects.
    pub follow_redirects: Option<bool>,

    /// Connect timeout in milliseconds. Default 6000.
    pub connect_timeout_ms: Option<u64>,

    /// Socket (read) timeout in milliseconds. Default 60000.
    pub socket_timeout_ms: Option<u64>,

    /// Pool connection-request timeout in milliseconds. Default 6000.
    pub request_timeout_ms: Option<u64>,

    /// Authentication scheme against the origin.
    pub authentication: Authentication,

    /// Credentials when `authentication = basic`.
    pub basic_authentication: Option<UserCredentialsConfig>,

    /// Credentials when `authentication = digest`.
    pub digest_authentication: Option<UserCredentialsConfig>,

    /// Proxy mode.
    pub proxy: ProxyMode,

    /// Proxy settings, required when `proxy = proxy`.
    pub proxy_configuration: Option<ProxyConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            host: "localhost".to_string(),
            port: 80,
            protocol: HttpProtocol::Http,
            base_path: String::new(),
            max_pool_connections: None,
            allow_self_signed: None,
            follow_redirects: None,
            connect_timeout_ms: None,
            socket_timeout_ms: None,
            request_timeout_ms: None,
            authentication: Authentication::None,
            basic_authentication: None,
            digest_authentication: None,
            proxy: ProxyMode::Off,
            proxy_configuration: None,
        }
    }
}

impl ClientConfig {
    /// Base URL for requests issued through this client.
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol.scheme(),
            self.host,
            self.port,
            self.base_path
        )
    }
}
