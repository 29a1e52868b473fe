//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce conditional requirements: credentials must be present when
//!   the matching authentication scheme is selected, proxy settings must
//!   be present when proxy mode is on
//! - Validate value ranges (non-empty hosts and ids)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the config value
//! - Runs at activation time, never deferred to request time

use crate::config::schema::{Authentication, ClientConfig, ConduitConfig, ListenerConfig, ProxyMode};

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `clients[0].proxy_configuration`.
    pub field: String,
    /// Human-readable description of the violated rule.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a full conduit configuration.
pub fn validate_config(config: &ConduitConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    collect_listener_errors(&config.listener, &mut errors);
    for (i, client) in config.clients.iter().enumerate() {
        collect_client_errors(client, &format!("clients[{}]", i), &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a single outbound client configuration.
pub fn validate_client_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    collect_client_errors(config, "client", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_listener_errors(config: &ListenerConfig, errors: &mut Vec<ValidationError>) {
    if config.host.trim().is_empty() {
        errors.push(ValidationError {
            field: "listener.host".into(),
            message: "bind host must not be empty".into(),
        });
    }
    if config.max_request_size == 0 {
        errors.push(ValidationError {
            field: "listener.max_request_size".into(),
            message: "maximum request size must be greater than zero".into(),
        });
    }
}

fn collect_client_errors(config: &ClientConfig, prefix: &str, errors: &mut Vec<ValidationError>) {
    if config.id.trim().is_empty() {
        errors.push(ValidationError {
            field: format!("{}.id", prefix),
            message: "configuration id must not be empty".into(),
        });
    }
    if config.host.trim().is_empty() {
        errors.push(ValidationError {
            field: format!("{}.host", prefix),
            message: "origin host must not be empty".into(),
        });
    }

    match config.authentication {
        Authentication::Basic if config.basic_authentication.is_none() => {
            errors.push(ValidationError {
                field: format!("{}.basic_authentication", prefix),
                message: "required when authentication = basic".into(),
            });
        }
        Authentication::Digest if config.digest_authentication.is_none() => {
            errors.push(ValidationError {
                field: format!("{}.digest_authentication", prefix),
                message: "required when authentication = digest".into(),
            });
        }
        _ => {}
    }

    if config.proxy == ProxyMode::Proxy {
        match &config.proxy_configuration {
            None => errors.push(ValidationError {
                field: format!("{}.proxy_configuration", prefix),
                message: "required when proxy = proxy".into(),
            }),
            Some(proxy) => {
                if proxy.host.trim().is_empty() {
                    errors.push(ValidationError {
                        field: format!("{}.proxy_configuration.host", prefix),
                        message: "proxy host must not be empty".into(),
                    });
                }
                match proxy.authentication {
                    Authentication::Basic if proxy.basic_authentication.is_none() => {
                        errors.push(ValidationError {
                            field: format!("{}.proxy_configuration.basic_authentication", prefix),
                            message: "required when proxy authentication = basic".into(),
                        });
                    }
                    Authentication::Digest if proxy.digest_authentication.is_none() => {
                        errors.push(ValidationError {
                            field: format!("{}.proxy_configuration.digest_authentication", prefix),
                            message: "required when proxy authentication = digest".into(),
                        });
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ProxyConfig, UserCredentialsConfig};

    fn valid_client() -> ClientConfig {
        ClientConfig {
            id: "client-1".into(),
            host: "example.com".into(),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn accepts_minimal_client() {
        assert!(validate_client_config(&valid_client()).is_ok());
    }

    #[test]
    fn rejects_proxy_mode_without_proxy_config() {
        let mut config = valid_client();
        config.proxy = ProxyMode::Proxy;

        let errors = validate_client_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "client.proxy_configuration");
    }

    #[test]
    fn rejects_basic_auth_without_credentials() {
        let mut config = valid_client();
        config.authentication = Authentication::Basic;

        let errors = validate_client_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "client.basic_authentication"));
    }

    #[test]
    fn rejects_digest_proxy_auth_without_credentials() {
        let mut config = valid_client();
        config.proxy = ProxyMode::Proxy;
        config.proxy_configuration = Some(ProxyConfig {
            host: "proxy.internal".into(),
            port: 3128,
            authentication: Authentication::Digest,
            basic_authentication: None,
            digest_authentication: None,
        });

        let errors = validate_client_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.field == "client.proxy_configuration.digest_authentication"));
    }

    #[test]
    fn collects_every_error() {
        let config = ClientConfig {
            id: "".into(),
            host: " ".into(),
            authentication: Authentication::Digest,
            ..ClientConfig::default()
        };

        let errors = validate_client_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn proxy_basic_auth_with_credentials_is_valid() {
        let mut config = valid_client();
        config.proxy = ProxyMode::Proxy;
        config.proxy_configuration = Some(ProxyConfig {
            host: "proxy.internal".into(),
            port: 3128,
            authentication: Authentication::Basic,
            basic_authentication: Some(UserCredentialsConfig {
                username: "user".into(),
                password: "pass".into(),
            }),
            digest_authentication: None,
        });

        assert!(validate_client_config(&config).is_ok());
    }
}
