use std::{env, net::SocketAddr};

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = env::var("BIND_PORT")
            .ok()
            .map(|value| value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);

        let config = Self {
            bind_addr,
            bind_port,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // The environment is process-global; keep these tests from interleaving.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn parse_defaults() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        env::remove_var("BIND_ADDR");
        env::remove_var("BIND_PORT");

        let config = Config::from_env().expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
    }

    #[test]
    fn custom_socket_parses() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        env::set_var("BIND_ADDR", "0.0.0.0");
        env::set_var("BIND_PORT", "9090");

        let config = Config::from_env().expect("config should parse");
        assert_eq!(
            config.bind_socket().expect("socket"),
            "0.0.0.0:9090".parse().expect("valid socket")
        );

        env::remove_var("BIND_ADDR");
        env::remove_var("BIND_PORT");
    }

    #[test]
    fn invalid_port_fails() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        env::remove_var("BIND_ADDR");
        env::set_var("BIND_PORT", "not-a-port");

        let err = Config::from_env().expect_err("expected invalid port error");
        assert!(matches!(err, ConfigError::InvalidPort));

        env::remove_var("BIND_PORT");
    }

    #[test]
    fn invalid_address_fails() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        env::set_var("BIND_ADDR", "not an address");
        env::remove_var("BIND_PORT");

        let err = Config::from_env().expect_err("expected invalid socket error");
        assert!(matches!(err, ConfigError::InvalidSocket));

        env::remove_var("BIND_ADDR");
    }
}
