//! Command-line and environment configuration for the server binary.
//!
//! Every flag can also be set through a `SWITCHYARD_*` environment variable.

use std::time::Duration;

use clap::Parser;

use crate::network::NetworkConfig;
use crate::observability::LogFormat;
use crate::service::ServerConfig;

/// Errors found while turning parsed arguments into server configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT secret must not be empty")]
    EmptySecret,
    #[error("default channel must not be empty")]
    EmptyChannel,
    #[error("max concurrent requests must be at least 1")]
    NoConcurrency,
    #[error("request timeout must be at least 1 second")]
    ZeroTimeout,
}

/// Switchyard request dispatch server.
#[derive(Debug, Parser)]
#[command(name = "switchyard")]
#[command(about = "Read/write request dispatch server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Address to bind.
    #[arg(long, env = "SWITCHYARD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on; 0 picks a free port.
    #[arg(short, long, env = "SWITCHYARD_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Request timeout in seconds.
    #[arg(long, env = "SWITCHYARD_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "SWITCHYARD_MAX_BODY_BYTES", default_value_t = 2 * 1024 * 1024)]
    pub max_body_bytes: usize,

    /// HS256 secret for bearer tokens.
    #[arg(long, env = "SWITCHYARD_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Channel used when the Accept header names none.
    #[arg(long, env = "SWITCHYARD_DEFAULT_CHANNEL", default_value = "json")]
    pub default_channel: String,

    /// Requests dispatched at once before shedding load.
    #[arg(long, env = "SWITCHYARD_MAX_CONCURRENT", default_value_t = 1000)]
    pub max_concurrent_requests: u32,

    /// Log output format.
    #[arg(long, env = "SWITCHYARD_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "SWITCHYARD_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Cli {
    /// Splits the arguments into network and dispatch configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for values that parse but cannot be served.
    pub fn into_configs(self) -> Result<(NetworkConfig, ServerConfig), ConfigError> {
        if self.jwt_secret.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::EmptySecret);
        }
        if self.default_channel.trim().is_empty() {
            return Err(ConfigError::EmptyChannel);
        }
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::NoConcurrency);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let network = NetworkConfig {
            host: self.host,
            port: self.port,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_body_bytes: self.max_body_bytes,
            jwt_secret: self.jwt_secret,
        };
        let server = ServerConfig {
            default_channel: self.default_channel,
            max_concurrent_requests: self.max_concurrent_requests,
            log_format: self.log_format,
            log_filter: self.log_filter,
        };
        Ok((network, server))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config_defaults() {
        let (network, server) = Cli::try_parse_from(["switchyard"])
            .unwrap()
            .into_configs()
            .unwrap();

        assert_eq!(network.port, 8080);
        assert_eq!(network.request_timeout, NetworkConfig::default().request_timeout);
        assert_eq!(network.max_body_bytes, NetworkConfig::default().max_body_bytes);
        assert_eq!(server.default_channel, ServerConfig::default().default_channel);
        assert_eq!(
            server.max_concurrent_requests,
            ServerConfig::default().max_concurrent_requests
        );
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "switchyard",
            "--port",
            "9000",
            "--jwt-secret",
            "s3cret",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);

        let (network, _server) = cli.into_configs().unwrap();
        assert_eq!(network.port, 9000);
        assert_eq!(network.jwt_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let cli = Cli::try_parse_from(["switchyard", "--jwt-secret", ""]).unwrap();
        assert_eq!(cli.into_configs().unwrap_err(), ConfigError::EmptySecret);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let cli = Cli::try_parse_from(["switchyard", "--max-concurrent-requests", "0"]).unwrap();
        assert_eq!(cli.into_configs().unwrap_err(), ConfigError::NoConcurrency);
    }

    #[test]
    fn unknown_log_format_fails_to_parse() {
        assert!(Cli::try_parse_from(["switchyard", "--log-format", "xml"]).is_err());
    }
}
