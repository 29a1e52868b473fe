//! Outbound client handle construction.
//!
//! # Responsibilities
//! - Build one pooled HTTP client per distinct configuration identity
//! - Resolve pool sizing, TLS trust policy, timeouts, redirects, proxy
//!   and credentials from the configuration
//! - Fail synchronously on bad configuration, leaving no half-built state
//!
//! # Design Decisions
//! - Defaults: 10 pooled connections, 6 s connect, 60 s socket read,
//!   6 s connection-request (folded into the connect deadline)
//! - "Allow self-signed" disables both chain and hostname verification;
//!   anything else uses standard validation
//! - Credentials go into a per-host store, never onto global state

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::client::auth::{CredentialStore, Credentials, HostKey};
use crate::config::schema::{Authentication, ClientConfig, ProxyMode, UserCredentialsConfig};

pub const DEFAULT_POOL_CONNECTIONS: usize = 10;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 6000;
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 60000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 6000;

/// Error raised while building a client handle.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid proxy address '{address}': {source}")]
    InvalidProxy {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{scheme} authentication selected but no credentials configured")]
    MissingCredentials { scheme: &'static str },

    #[error("proxy mode selected but no proxy configured")]
    MissingProxyConfig,

    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
}

/// A pooled outbound client plus its credential store. Created once per
/// configuration identity and shared by every activation using it.
pub struct ClientHandle {
    client: reqwest::Client,
    credentials: CredentialStore,
    config_id: Option<String>,
    closed: AtomicBool,
}

impl ClientHandle {
    /// Build a handle from a client configuration.
    pub fn build(config: &ClientConfig) -> Result<Self, ClientError> {
        let pool_size = config
            .max_pool_connections
            .unwrap_or(DEFAULT_POOL_CONNECTIONS);
        let connect_timeout = config
            .connect_timeout_ms
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS);
        let socket_timeout = config
            .socket_timeout_ms
            .unwrap_or(DEFAULT_SOCKET_TIMEOUT_MS);

        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(pool_size)
            .connect_timeout(Duration::from_millis(connect_timeout))
            .read_timeout(Duration::from_millis(socket_timeout));

        if let Some(request_timeout) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(request_timeout));
        }

        if config.follow_redirects == Some(false) {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        if config.allow_self_signed.unwrap_or(false) {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        let mut credentials = CredentialStore::default();

        let origin_key = HostKey::new(&config.host, config.port);
        match config.authentication {
            Authentication::None => {}
            Authentication::Basic => {
                let creds = required(&config.basic_authentication, "basic")?;
                credentials.add_origin(
                    origin_key,
                    Credentials::Basic {
                        username: creds.username.clone(),
                        password: creds.password.clone(),
                    },
                );
            }
            Authentication::Digest => {
                let creds = required(&config.digest_authentication, "digest")?;
                credentials.add_origin(
                    origin_key,
                    Credentials::Digest {
                        username: creds.username.clone(),
                        password: creds.password.clone(),
                    },
                );
            }
        }

        if config.proxy == ProxyMode::Proxy {
            let proxy_config = config
                .proxy_configuration
                .as_ref()
                .ok_or(ClientError::MissingProxyConfig)?;
            let address = format!("http://{}:{}", proxy_config.host, proxy_config.port);
            let mut proxy =
                reqwest::Proxy::all(&address).map_err(|source| ClientError::InvalidProxy {
                    address: address.clone(),
                    source,
                })?;

            let proxy_key = HostKey::new(&proxy_config.host, proxy_config.port);
            match proxy_config.authentication {
                Authentication::None => {}
                Authentication::Basic => {
                    let creds = required(&proxy_config.basic_authentication, "proxy basic")?;
                    proxy = proxy.basic_auth(&creds.username, &creds.password);
                    credentials.add_proxy(
                        proxy_key,
                        Credentials::Basic {
                            username: creds.username.clone(),
                            password: creds.password.clone(),
                        },
                    );
                }
                Authentication::Digest => {
                    let creds = required(&proxy_config.digest_authentication, "proxy digest")?;
                    credentials.add_proxy(
                        proxy_key,
                        Credentials::Digest {
                            username: creds.username.clone(),
                            password: creds.password.clone(),
                        },
                    );
                }
            }
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(ClientError::Build)?;

        Ok(Self {
            client,
            credentials,
            config_id: if config.id.is_empty() {
                None
            } else {
                Some(config.id.clone())
            },
            closed: AtomicBool::new(false),
        })
    }

    /// Build an ad-hoc handle with default settings only. Ad-hoc handles
    /// are never shared.
    pub fn build_default() -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(DEFAULT_POOL_CONNECTIONS)
            .connect_timeout(Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS))
            .read_timeout(Duration::from_millis(DEFAULT_SOCKET_TIMEOUT_MS))
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            client,
            credentials: CredentialStore::default(),
            config_id: None,
            closed: AtomicBool::new(false),
        })
    }

    /// The configuration identity this handle was built for, if shared.
    pub fn config_id(&self) -> Option<&str> {
        self.config_id.as_deref()
    }

    pub(crate) fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Tear the handle down. Idle pooled connections are closed when the
    /// last reference drops; this marks the handle and is called exactly
    /// once by the owning registry.
    pub(crate) fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(config_id = ?self.config_id, "http client torn down");
        }
    }

    /// Whether the registry has torn this handle down.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("config_id", &self.config_id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn required<'a>(
    value: &'a Option<UserCredentialsConfig>,
    scheme: &'static str,
) -> Result<&'a UserCredentialsConfig, ClientError> {
    value
        .as_ref()
        .ok_or(ClientError::MissingCredentials { scheme })
}
