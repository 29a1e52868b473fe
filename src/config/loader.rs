//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ConduitConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ConduitConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ConduitConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Authentication, ProxyMode};

    #[test]
    fn parses_client_with_proxy() {
        let raw = r#"
            [listener]
            host = "127.0.0.1"
            port = 9091

            [[clients]]
            id = "orders-api"
            host = "orders.internal"
            port = 8443
            protocol = "https"
            proxy = "proxy"

            [clients.proxy_configuration]
            host = "proxy.internal"
            port = 3128
        "#;

        let config: ConduitConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.listener.port, 9091);
        assert_eq!(config.clients.len(), 1);
        assert_eq!(config.clients[0].proxy, ProxyMode::Proxy);
        assert_eq!(config.clients[0].authentication, Authentication::None);
        assert_eq!(
            config.clients[0].base_url(),
            "https://orders.internal:8443"
        );
    }

    #[test]
    fn defaults_allow_empty_config() {
        let config: ConduitConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address(), "0.0.0.0:8080");
        assert!(config.clients.is_empty());
    }
}
