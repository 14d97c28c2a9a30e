use crate::observability::LogFormat;

/// Server-level configuration for request dispatch.
///
/// Controls the default response channel, load shedding and log output.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Response channel used when the client's `Accept` header names none
    /// of the known channels.
    pub default_channel: String,
    /// Maximum number of requests dispatched at once before load shedding.
    pub max_concurrent_requests: u32,
    /// Log output format.
    pub log_format: LogFormat,
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_channel: "json".to_string(),
            max_concurrent_requests: 1000,
            log_format: LogFormat::Pretty,
            log_filter: "info".to_string(),
        }
    }
}
